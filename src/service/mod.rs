pub mod post_service;
pub mod slug_service;
pub mod tag_service;
