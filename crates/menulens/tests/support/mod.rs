#![allow(dead_code)]

pub mod testkit;
