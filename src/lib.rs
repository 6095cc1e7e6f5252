pub mod board;
pub mod builder;
pub mod chain;
pub mod config;
pub mod error;
pub mod geometry;
pub mod manual;
pub mod matrix;
pub mod mcu;
pub mod netlist;
pub mod output;
pub mod partstore;
pub mod pcb;
pub mod schematic;
pub mod tools;
pub mod util;
// cmd and reports belong to the binary (src/main.rs).
