// News collection — the NewsData.io client and the dated article files.

pub mod client;
pub mod store;

pub use client::{
    collect_news, Collection, NewsDataClient, NewsPageSource, NewsQuery, NewsSource,
    StoredArticle,
};
