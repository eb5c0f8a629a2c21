pub mod digest_store;
pub mod story_fetcher;
