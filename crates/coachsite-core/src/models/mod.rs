//! Data models for the coaching-institute backend.
//!
//! This module contains the wire types exchanged with the REST API:
//!
//! - `Envelope`: the `{ success, data, message }` wrapper on every response
//! - `ResourceKind`: the closed set of cacheable content categories
//! - Content types: `Course`, `Topper`, `Achievement`, `GalleryItem`, `HomeSection`
//! - Contact types: `Contact`, `ContactSubmission`, `ContactUpdate`, `ContactStats`
//! - Admin types: `AdminProfile`, `LoginData`

pub mod admin;
pub mod contact;
pub mod content;
pub mod envelope;
pub mod resource;

pub use admin::{AdminProfile, LoginData, VerifyData};
pub use contact::{
    Contact, ContactList, ContactPriority, ContactStats, ContactStatus, ContactSubmission,
    ContactUpdate,
};
pub use content::{
    Achievement, AchievementList, Course, CourseList, GalleryItem, GalleryList, HomeSection,
    Instructor, Pagination, Topper, TopperList,
};
pub use envelope::{decode, Envelope};
pub use resource::ResourceKind;
