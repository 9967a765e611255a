pub mod remotehosts;
