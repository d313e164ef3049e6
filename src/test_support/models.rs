use serde::Serialize;

use crate::model::RecordMeta;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Line {
    pub season: u32,
    pub episode: u32,
    pub character: String,
    pub text: String,
    #[serde(skip)]
    pub meta: RecordMeta,
}

impl Line {
    pub fn new(season: u32, episode: u32, character: &str, text: &str) -> Self {
        Self {
            season,
            episode,
            character: character.to_owned(),
            text: text.to_owned(),
            meta: RecordMeta::default(),
        }
    }
}

crate::kinto_model!(Line, bucket = "southpark", collection = "scripts", meta = meta);

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Post {
    pub title: String,
    pub body: String,
    pub author_id: Option<String>,
    #[serde(skip)]
    pub meta: RecordMeta,
}

impl Post {
    pub fn new(title: &str, body: &str) -> Self {
        Self {
            title: title.to_owned(),
            body: body.to_owned(),
            ..Default::default()
        }
    }
}

crate::kinto_model!(Post, bucket = "blog", collection = "posts", meta = meta);

/// Flattens its meta, so `id` shows up in its serialized form.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Author {
    pub name: String,
    pub url: String,
    #[serde(flatten)]
    pub meta: RecordMeta,
}

impl Author {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_owned(),
            url: url.to_owned(),
            meta: RecordMeta::default(),
        }
    }
}

crate::kinto_model!(Author, bucket = "blog", collection = "authors", meta = meta);

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Unbucketed {
    pub name: String,
    #[serde(skip)]
    pub meta: RecordMeta,
}

crate::kinto_model!(Unbucketed, bucket = "", collection = "orphans", meta = meta);
