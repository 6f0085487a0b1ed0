pub mod seen;
