//! Shared catalog fixture for query-crate tests.

use shelfdb_schema::prelude::*;

pub const SHELF: ModuleId = ModuleId::new(49);
pub const MEDIA: ModuleId = ModuleId::new(50);
pub const MOVIE: ModuleId = ModuleId::new(51);
pub const BOOK: ModuleId = ModuleId::new(54);
pub const ALBUM: ModuleId = ModuleId::new(56);
pub const TRACK: ModuleId = ModuleId::new(57);
pub const PERSON: ModuleId = ModuleId::new(60);
pub const GENRE: ModuleId = ModuleId::new(70);

pub const TITLE: i32 = 1;
pub const YEAR: i32 = 2;
pub const RATING: i32 = 3;
pub const WATCHED: i32 = 4;
pub const RELEASE: i32 = 5;
pub const GENRES: i32 = 6;
pub const DIRECTOR: i32 = 7;
pub const COVER: i32 = 8;

/// A small catalog: movies and books under an abstract media module, a
/// per-owner genre template, an album/track parent-child pair, and an
/// abstract container scope with no members.
pub fn catalog() -> ModuleRegistry {
    let mut builder = RegistryBuilder::new();

    builder.register_base_property_template(
        Module::new(GENRE, ModuleKind::Property, "genre", "genre")
            .with_fields(FieldList::from_iter([
                Field::new(1, GENRE, "name", ValueType::String).with_column("name"),
            ]))
            .with_display_field(1),
    );

    builder
        .register_module(
            Module::new(PERSON, ModuleKind::Associate, "person", "person")
                .with_fields(FieldList::from_iter([
                    Field::new(1, PERSON, "name", ValueType::String).with_column("name"),
                ]))
                .with_display_field(1),
        )
        .expect("person registers");

    builder
        .register_module(
            Module::new(MOVIE, ModuleKind::Media, "movie", "movie")
                .with_fields(FieldList::from_iter([
                    Field::new(TITLE, MOVIE, "title", ValueType::String).with_column("title"),
                    Field::new(YEAR, MOVIE, "year", ValueType::LongInt).with_column("year"),
                    Field::new(RATING, MOVIE, "rating", ValueType::Double).with_column("rating"),
                    Field::new(WATCHED, MOVIE, "watched", ValueType::Boolean)
                        .with_column("watched"),
                    Field::new(RELEASE, MOVIE, "release", ValueType::Date).with_column("release"),
                    Field::new(GENRES, MOVIE, "genres", ValueType::ReferenceCollection)
                        .with_reference(GENRE),
                    Field::new(DIRECTOR, MOVIE, "director", ValueType::SingleReference)
                        .with_column("director")
                        .with_reference(PERSON),
                    Field::new(COVER, MOVIE, "cover", ValueType::Picture),
                ]))
                .with_display_field(TITLE),
        )
        .expect("movie registers");

    builder
        .register_module(
            Module::new(BOOK, ModuleKind::Media, "book", "book")
                .with_fields(FieldList::from_iter([
                    Field::new(TITLE, BOOK, "title", ValueType::String).with_column("title"),
                    Field::new(YEAR, BOOK, "year", ValueType::LongInt).with_column("year"),
                ]))
                .with_display_field(TITLE),
        )
        .expect("book registers");

    builder
        .register_module(
            Module::new(MEDIA, ModuleKind::Media, "media", "media")
                .with_fields(FieldList::from_iter([
                    Field::new(TITLE, MEDIA, "title", ValueType::String).with_column("title"),
                    Field::new(YEAR, MEDIA, "year", ValueType::LongInt).with_column("year"),
                ]))
                .with_scope(AbstractScope::Kind(ModuleKind::Media)),
        )
        .expect("media registers");

    builder
        .register_module(
            Module::new(ALBUM, ModuleKind::Plain, "album", "album")
                .with_fields(FieldList::from_iter([
                    Field::new(TITLE, ALBUM, "title", ValueType::String).with_column("title"),
                ]))
                .with_child(TRACK)
                .with_display_field(TITLE),
        )
        .expect("album registers");

    builder
        .register_module(
            Module::new(TRACK, ModuleKind::Plain, "track", "track")
                .with_fields(FieldList::from_iter([
                    Field::new(TITLE, TRACK, "title", ValueType::String).with_column("title"),
                    Field::new(2, TRACK, "album", ValueType::ParentReference)
                        .with_column("albumID")
                        .with_reference(ALBUM),
                ]))
                .with_parent(ALBUM)
                .not_top_level(),
        )
        .expect("track registers");

    builder
        .register_module(
            Module::new(SHELF, ModuleKind::Plain, "shelf", "shelf")
                .with_scope(AbstractScope::ContainerManaged),
        )
        .expect("shelf registers");

    builder.build().expect("catalog builds")
}
