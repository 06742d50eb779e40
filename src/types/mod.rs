pub mod post;
pub mod reply;
pub mod user;

pub use post::{field_errors, validate_form, FieldErrors, NewPost, Post, PostForm};
pub use reply::{NewReply, Reply, ReplyForm};
pub use user::{LoginRequest, LoginResponse, NewUser, User};
