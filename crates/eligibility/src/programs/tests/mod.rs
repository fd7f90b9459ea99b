mod common;
mod contributors;
mod programs;
