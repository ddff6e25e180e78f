mod post;
mod user;

pub use post::{format_date, html_to_text, Post, PostData, PostEdit};
pub use user::{Profile, User, UserData};
