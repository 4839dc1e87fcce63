//! Local rule-based answers used when no provider produces one
use rand::seq::SliceRandom;
use std::fmt;
use std::sync::Arc;

use crate::breeds::BreedCatalog;

/// Placeholder replaced by the detected breed (or "your dog")
const BREED_SLOT: &str = "{breed}";
const NO_BREED: &str = "your dog";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CareIntent {
    Grooming,
    Diet,
    Exercise,
    Training,
    Health,
}

impl CareIntent {
    /// Classification order; the first intent with a matching keyword wins
    pub const ALL: [CareIntent; 5] = [
        CareIntent::Grooming,
        CareIntent::Diet,
        CareIntent::Exercise,
        CareIntent::Training,
        CareIntent::Health,
    ];

    pub const fn keywords(&self) -> &'static [&'static str] {
        match self {
            CareIntent::Grooming => &[
                "groom", "brush", "bath", "shed", "coat", "fur", "nail", "trim",
            ],
            CareIntent::Diet => &[
                "diet", "food", "feed", "eat", "nutrition", "meal", "kibble",
            ],
            CareIntent::Exercise => &[
                "exercise", "walk", "run", "play", "active", "energy", "fetch",
            ],
            CareIntent::Training => &[
                "train", "obedien", "command", "behavio", "potty", "leash", "bark", "bite",
            ],
            CareIntent::Health => &[
                "health", "sick", "vet", "vaccin", "disease", "symptom", "ill", "vomit", "breath",
            ],
        }
    }

    pub const fn templates(&self) -> &'static [&'static str] {
        match self {
            CareIntent::Grooming => &[
                "Grooming tips for {breed}: brush two to three times a week to remove loose hair, bathe every four to six weeks with a dog shampoo, and trim nails monthly.",
                "To keep {breed} looking good, match the brush to the coat (slicker for long coats, bristle for short), check ears weekly and brush teeth a few times a week.",
                "For {breed}, regular brushing controls shedding and mats. Bathe only when needed so the coat keeps its natural oils, and keep nails short enough not to click on the floor.",
            ],
            CareIntent::Diet => &[
                "For {breed}, feed a complete commercial food suited to age and size, split into two meals a day, and keep fresh water available at all times.",
                "Diet advice for {breed}: measure portions by the food's guidelines and adjust for body condition. Keep treats under ten percent of daily calories and avoid chocolate, grapes, onions and xylitol.",
            ],
            CareIntent::Exercise => &[
                "{breed} needs daily exercise: aim for 30 to 60 minutes of walks and play, adjusted for age and energy level.",
                "Keep {breed} active with a mix of walks, fetch and puzzle toys. Mental exercise tires dogs out as much as running does.",
                "For {breed}, split exercise into two or three sessions a day and avoid hard activity right after meals or in the hottest part of the day.",
            ],
            CareIntent::Training => &[
                "Training {breed} works best with short, positive sessions: reward the behaviour you want right away and keep each session to 5 to 10 minutes.",
                "Start {breed} with the basics (sit, stay, come) using treats and praise. Be consistent with commands and never punish after the fact.",
            ],
            CareIntent::Health => &[
                "For health concerns with {breed}, book a veterinarian visit. Keep vaccinations, deworming and flea and tick prevention up to date.",
                "Watch {breed} for changes in appetite, energy, stool or breathing. Anything lasting more than a day, or any sudden symptom, should be checked by a vet.",
            ],
        }
    }

    /// Short guidance used in the composite answer
    const fn summary(&self) -> &'static str {
        match self {
            CareIntent::Grooming => {
                "Grooming: brush a few times a week, bathe every four to six weeks and trim nails monthly."
            }
            CareIntent::Diet => {
                "Diet: feed a balanced food suited to age and size in two measured meals, with fresh water always available."
            }
            CareIntent::Exercise => {
                "Exercise: plan 30 to 60 minutes of walks and play every day, plus some mental games."
            }
            CareIntent::Training => {
                "Training: use short, reward-based sessions and stay consistent with commands."
            }
            CareIntent::Health => {
                "Health: keep vaccinations current and see a vet for any sudden change."
            }
        }
    }

    /// Keywords are stems: each must start a word, so "vet" matches "vets"
    /// but not "velvet"
    fn matches(&self, words: &[&str]) -> bool {
        self.keywords()
            .iter()
            .any(|k| words.iter().any(|w| w.starts_with(k)))
    }
}

impl fmt::Display for CareIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CareIntent::Grooming => "grooming",
            CareIntent::Diet => "diet",
            CareIntent::Exercise => "exercise",
            CareIntent::Training => "training",
            CareIntent::Health => "health",
        };
        f.write_str(s)
    }
}

/// First matching intent in classification order
pub fn classify(question: &str) -> Option<CareIntent> {
    let lowered = question.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    CareIntent::ALL.into_iter().find(|intent| intent.matches(&words))
}

pub struct FallbackResponder {
    catalog: Arc<BreedCatalog>,
}

impl FallbackResponder {
    pub fn new(catalog: Arc<BreedCatalog>) -> Self {
        Self { catalog }
    }

    /// Always returns a non-empty answer
    pub fn respond(&self, question: &str) -> String {
        let breed = self.catalog.detect(question).unwrap_or(NO_BREED);
        match classify(question) {
            Some(intent) => {
                tracing::debug!(%intent, breed, "Answering from fallback templates");
                let template = intent
                    .templates()
                    .choose(&mut rand::thread_rng())
                    .copied()
                    .unwrap_or_else(|| intent.summary());
                render(template, breed)
            }
            None => composite_answer(breed),
        }
    }

    /// Every answer `respond` can give for a question with this intent and breed
    pub fn candidates(intent: CareIntent, breed: Option<&str>) -> Vec<String> {
        let breed = breed.unwrap_or(NO_BREED);
        intent
            .templates()
            .iter()
            .map(|t| render(t, breed))
            .collect()
    }
}

fn render(template: &str, breed: &str) -> String {
    let rendered = template.replace(BREED_SLOT, breed);
    // Templates that open with the slot read better capitalized
    let mut chars = rendered.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => first.to_uppercase().chain(chars).collect(),
        _ => rendered,
    }
}

fn composite_answer(breed: &str) -> String {
    let sections: Vec<&str> = [
        CareIntent::Grooming,
        CareIntent::Diet,
        CareIntent::Exercise,
        CareIntent::Training,
    ]
    .iter()
    .map(|intent| intent.summary())
    .collect();

    format!(
        "Here is some general care guidance for {breed}:\n\n{}\n\nWhich area would you like to know more about: grooming, diet, exercise, training or health?",
        sections.join("\n")
    )
}
