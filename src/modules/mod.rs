pub mod user {
    pub mod schema;
    pub mod model;
    pub mod repository;
    pub mod repository_pg;
    pub mod handle;
    pub mod service;
    pub mod route;
}

pub mod friend {
    pub mod schema;
    pub mod model;
    pub mod error;
    pub mod repository;
    pub mod repository_pg;
    pub mod events;
    pub mod handle;
    pub mod service;
    pub mod route;
    pub mod ws;
}
