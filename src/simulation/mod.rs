pub mod group_generator;
