//! Low-level painting of surface rows and tiles.

pub mod row_renderer;
pub mod text_utils;
