// Concrete collaborator implementations behind the fetch-stage traits.

pub mod search;
pub mod status;
