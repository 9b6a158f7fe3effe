use serde::{Deserialize, Serialize};

use crate::models::{Author, Comment, Group, Post};

// -- Session claims --

/// Claims carried by the session token, in the cookie or a bearer header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub exp: usize,
}

// -- Pagination --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDocument<T> {
    pub number: u32,
    pub num_pages: u32,
    pub count: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<u32>,
    pub previous_page_number: Option<u32>,
    pub items: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// Kept as raw text: anything that is not a positive integer means page 1.
    pub page: Option<String>,
}

// -- Listings --

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexResponse {
    pub page: PageDocument<Post>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupResponse {
    pub group: Group,
    pub page: PageDocument<Post>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub author: Author,
    pub post_count: u64,
    pub follower_count: u64,
    pub following_count: u64,
    /// Whether the viewer follows this author. Always false for anonymous viewers.
    pub following: bool,
    pub page: PageDocument<Post>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FollowFeedResponse {
    pub page: PageDocument<Post>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub author: Author,
    pub post_count: u64,
    pub post: Post,
    pub comments: Vec<Comment>,
}

/// Context for the new-post and edit-post forms.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostFormContext {
    pub post: Option<Post>,
    pub groups: Vec<Group>,
}

// -- Comments --

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub text: String,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginContext {
    pub next: Option<String>,
}

// -- Misc pages --

#[derive(Debug, Serialize, Deserialize)]
pub struct StaticPage {
    pub url: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDocument {
    pub status: u16,
    pub error: String,
    pub path: Option<String>,
}
