// crates/jd-cli/src/pages/mod.rs
//
// Terminal pages. Rendering is pure: each page turns query states into text,
// so the commands only load data and print.

pub mod home;
