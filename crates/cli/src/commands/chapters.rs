//! `shiksha chapters`: Browse the curriculum catalog.

use super::{CliResult, load_config, open_catalog};
use shiksha_core::curriculum::CurriculumStore;

pub async fn run(grade: Option<String>, subject: Option<String>) -> CliResult {
    let config = load_config()?;
    let catalog = open_catalog(&config)?;

    let (Some(grade), Some(subject)) = (grade, subject) else {
        println!("📚 Catalog textbooks");
        println!("====================");
        if catalog.textbooks().is_empty() {
            println!("   (catalog is empty)");
        }
        for book in catalog.textbooks() {
            println!(
                "  Grade {:<4} {:<24} {} chapters",
                book.grade, book.subject, book.chapters
            );
        }
        println!("\n  Pass --grade and --subject to list chapters.");
        return Ok(());
    };

    let chapters = catalog.get_available_chapters(&grade, &subject).await?;
    println!("📖 Grade {grade} {subject}");
    println!("==================");
    if chapters.is_empty() {
        println!("   No chapters found.");
    }
    for chapter in &chapters {
        println!("  {:>2}. {}", chapter.chapter_number, chapter.chapter_name);
    }

    Ok(())
}
