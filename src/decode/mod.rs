pub mod descriptor;
pub mod document;
pub mod header;
pub mod merged;
pub mod options;
pub mod reader;
pub mod records;
pub mod text;
pub mod tree;
