//! Built-in board strategies, one module per site.

pub mod clien;
pub mod cook82;
pub mod ddanzi;
pub mod empak;
