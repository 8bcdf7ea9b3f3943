pub mod post;
pub mod slug;
pub mod tag;
