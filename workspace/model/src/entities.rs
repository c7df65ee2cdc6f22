//! This file serves as the root for all SeaORM entity modules.
//! The user table is the only persisted entity of the HousePark account service.

pub mod user;
