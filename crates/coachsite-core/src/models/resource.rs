use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Public content categories. Each one owns a cache slot and a REST
/// collection; the set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Courses,
    Toppers,
    Achievements,
    Gallery,
    Home,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Courses,
        ResourceKind::Toppers,
        ResourceKind::Achievements,
        ResourceKind::Gallery,
        ResourceKind::Home,
    ];

    /// Cache slot name.
    pub fn cache_key(&self) -> &'static str {
        match self {
            ResourceKind::Courses => "courses",
            ResourceKind::Toppers => "toppers",
            ResourceKind::Achievements => "achievements",
            ResourceKind::Gallery => "gallery",
            ResourceKind::Home => "home",
        }
    }

    /// Collection path relative to the API base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            ResourceKind::Courses => "/courses",
            ResourceKind::Toppers => "/toppers",
            ResourceKind::Achievements => "/achievements",
            ResourceKind::Gallery => "/gallery",
            ResourceKind::Home => "/home",
        }
    }

    /// Multipart field name the backend expects for the uploaded image.
    pub fn upload_field(&self) -> &'static str {
        match self {
            ResourceKind::Toppers => "photo",
            _ => "image",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ResourceKind::Courses => "Courses",
            ResourceKind::Toppers => "Toppers",
            ResourceKind::Achievements => "Achievements",
            ResourceKind::Gallery => "Gallery",
            ResourceKind::Home => "Home sections",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cache_key())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "courses" | "course" => Ok(ResourceKind::Courses),
            "toppers" | "topper" => Ok(ResourceKind::Toppers),
            "achievements" | "achievement" => Ok(ResourceKind::Achievements),
            "gallery" => Ok(ResourceKind::Gallery),
            "home" | "home-sections" | "home_sections" => Ok(ResourceKind::Home),
            other => Err(format!("Unknown resource category: {}", other)),
        }
    }
}
