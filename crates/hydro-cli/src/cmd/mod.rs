pub mod grouping;
pub mod issue;
pub mod serve;
pub mod station;
pub mod whoami;
