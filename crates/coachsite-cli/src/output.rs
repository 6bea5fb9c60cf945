//! Plain-text rendering for terminal output.

use coachsite_core::admin::DashboardStats;
use coachsite_core::api::ApiError;
use coachsite_core::cache::CacheAges;
use coachsite_core::models::{
    decode, AchievementList, AdminProfile, Contact, ContactList, ContactStats, CourseList,
    GalleryList, HomeSection, ResourceKind, TopperList,
};
use coachsite_core::utils::{
    format_date, format_optional, format_phone, format_price, format_value, truncate_string,
};
use serde_json::Value;

const TITLE_WIDTH: usize = 40;

pub fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", value),
    }
}

fn print_total(shown: usize, total: Option<u64>) {
    match total {
        Some(total) if total as usize > shown => println!("\n{} of {} shown", shown, total),
        _ => println!("\n{} total", shown),
    }
}

pub fn print_courses(list: &CourseList) {
    for course in &list.courses {
        let price = course
            .effective_price()
            .map(format_price)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<26} {:<40} {:<14} {:>12}",
            course.id,
            truncate_string(&course.title, TITLE_WIDTH),
            format_optional(&course.category, "-"),
            price
        );
    }
    print_total(list.courses.len(), list.pagination.as_ref().map(|p| p.total));
}

pub fn print_toppers(list: &TopperList) {
    for topper in &list.toppers {
        println!(
            "{:<26} {:<28} {:<16} {:<10} {}",
            topper.id,
            truncate_string(&topper.name, 28),
            format_optional(&topper.exam, "-"),
            format_value(&topper.rank),
            format_value(&topper.year)
        );
    }
    print_total(list.toppers.len(), list.pagination.as_ref().map(|p| p.total));
}

pub fn print_achievements(list: &AchievementList) {
    for achievement in &list.achievements {
        println!(
            "{:<26} {:<40} {:<16} {}",
            achievement.id,
            truncate_string(&achievement.title, TITLE_WIDTH),
            format_optional(&achievement.category, "-"),
            achievement
                .date
                .as_deref()
                .map(format_date)
                .unwrap_or_default()
        );
    }
    print_total(
        list.achievements.len(),
        list.pagination.as_ref().map(|p| p.total),
    );
}

pub fn print_gallery(list: &GalleryList) {
    for item in &list.items {
        println!(
            "{:<26} {:<40} {:<16} {}",
            item.id,
            truncate_string(&item.title, TITLE_WIDTH),
            format_optional(&item.category, "-"),
            format_optional(&item.image, "")
        );
    }
    print_total(list.items.len(), list.pagination.as_ref().map(|p| p.total));
}

pub fn print_home(sections: &[HomeSection]) {
    for section in sections {
        let state = if section.is_active == Some(false) {
            " (hidden)"
        } else {
            ""
        };
        println!(
            "{:<16} {}{}",
            section.section,
            format_optional(&section.title, "-"),
            state
        );
        if let Some(subtitle) = &section.subtitle {
            println!("{:<16} {}", "", truncate_string(subtitle, 70));
        }
    }
}

/// Render any category's list payload with its typed table.
pub fn print_resource(kind: ResourceKind, value: Value) -> Result<(), ApiError> {
    match kind {
        ResourceKind::Courses => print_courses(&decode(value)?),
        ResourceKind::Toppers => print_toppers(&decode(value)?),
        ResourceKind::Achievements => print_achievements(&decode(value)?),
        ResourceKind::Gallery => print_gallery(&decode(value)?),
        ResourceKind::Home => print_home(&decode::<Vec<HomeSection>>(value)?),
    }
    Ok(())
}

pub fn print_contacts(list: &ContactList) {
    for contact in &list.contacts {
        let marker = if contact.is_read { ' ' } else { '*' };
        println!(
            "{}{:<25} {:<24} {:<30} {:<12} {}",
            marker,
            contact.id,
            truncate_string(&contact.name, 24),
            truncate_string(&contact.email, 30),
            contact.status.map(|s| s.as_str()).unwrap_or("New"),
            contact
                .created_at
                .as_deref()
                .map(format_date)
                .unwrap_or_default()
        );
    }
    print_total(list.contacts.len(), list.pagination.as_ref().map(|p| p.total));
}

pub fn print_contact(contact: &Contact) {
    println!("{} <{}>", contact.name, contact.email);
    if let Some(phone) = &contact.phone {
        println!("Phone:    {}", format_phone(phone));
    }
    if let Some(course) = &contact.course {
        println!("Course:   {}", course);
    }
    println!(
        "Status:   {}",
        contact.status.map(|s| s.as_str()).unwrap_or("New")
    );
    if let Some(priority) = contact.priority {
        println!("Priority: {}", priority.as_str());
    }
    if let Some(created) = &contact.created_at {
        println!("Received: {}", format_date(created));
    }
    println!("Subject:  {}", format_optional(&contact.subject, "-"));
    println!();
    println!("{}", format_optional(&contact.message, ""));
    if let Some(notes) = &contact.admin_notes {
        println!("\nNotes: {}", notes);
    }
}

pub fn print_contact_stats(stats: &ContactStats) {
    println!(
        "{} messages, {} unread",
        stats.total_contacts, stats.unread_contacts
    );
}

pub fn print_dashboard(stats: &DashboardStats) {
    println!("Courses       {:>6}", stats.courses);
    println!("Toppers       {:>6}", stats.toppers);
    println!("Achievements  {:>6}", stats.achievements);
    println!("Gallery       {:>6}", stats.gallery);
    println!(
        "Contacts      {:>6}  ({} unread)",
        stats.contacts, stats.unread_contacts
    );
}

pub fn print_admin(admin: &AdminProfile) {
    println!("{} <{}>", admin.display_name(), admin.email);
    if let Some(role) = &admin.role {
        println!("Role:       {}", role);
    }
    if let Some(last_login) = &admin.last_login {
        println!("Last login: {}", format_date(last_login));
    }
}

pub fn print_cache_ages(ages: &CacheAges) {
    for kind in ResourceKind::ALL {
        if let Some(age) = ages.get(kind) {
            eprintln!("{} cached {}", kind.display_name(), age);
        }
    }
}
