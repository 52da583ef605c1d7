pub mod odds;
