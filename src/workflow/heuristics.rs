// src/workflow/heuristics.rs
//! Keyword heuristics that turn free-form hiring requests into structured
//! job specification fields and search plans.
//!
//! Both the processing pipeline and `JobSpecService::parse_from_input` go
//! through `extract_fields`, so a retry through either path yields the same
//! fields.

use crate::types::{
    ExperienceRange, JobSpecPatch, JobSpecification, SalaryRange, SearchFilters, SearchPlan,
    SearchWeights, WorkMode,
};

pub const STARTUP_COMPANIES: [&str; 5] = ["Stripe", "Figma", "Notion", "Linear", "Vercel"];
const BIG_TECH_COMPANIES: [&str; 5] = ["Google", "Meta", "Microsoft", "Amazon", "Apple"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleTemplate {
    Engineering,
    Design,
    Product,
    Data,
    Sales,
    General,
}

impl RoleTemplate {
    fn companies(&self) -> &'static [&'static str] {
        match self {
            Self::Engineering => &BIG_TECH_COMPANIES,
            Self::Design => &["Apple", "Airbnb", "Figma", "Adobe", "Spotify"],
            Self::Product => &["Google", "Meta", "Airbnb", "Uber", "Spotify"],
            Self::Data => &["Google", "Meta", "Netflix", "Databricks", "Snowflake"],
            Self::Sales => &["Salesforce", "HubSpot", "Oracle", "Zendesk", "Atlassian"],
            Self::General => &["Google", "Microsoft", "Amazon", "Salesforce", "Deloitte"],
        }
    }

    fn base_title(&self) -> Option<&'static str> {
        match self {
            Self::Engineering => Some("Software Engineer"),
            Self::Design => Some("Product Designer"),
            Self::Product => Some("Product Manager"),
            Self::Data => Some("Data Scientist"),
            Self::Sales => Some("Account Executive"),
            Self::General => None,
        }
    }

    fn default_skills(&self) -> &'static [&'static str] {
        match self {
            Self::Engineering => &["JavaScript", "System Design", "Git", "Testing"],
            Self::Design => &["Figma", "Prototyping", "User Research", "Design Systems"],
            Self::Product => &["Roadmapping", "User Research", "Analytics", "Stakeholder Management"],
            Self::Data => &["Python", "SQL", "Statistics", "Machine Learning"],
            Self::Sales => &["Negotiation", "CRM", "Pipeline Management", "Prospecting"],
            Self::General => &["Communication", "Collaboration", "Problem Solving"],
        }
    }

    fn responsibilities(&self) -> &'static str {
        match self {
            Self::Engineering => {
                "Design, build and maintain production services; review code; mentor teammates"
            }
            Self::Design => "Own end-to-end product design from research to polished UI",
            Self::Product => "Define product strategy, prioritise the roadmap and ship with engineering",
            Self::Data => "Build models and analyses that drive product and business decisions",
            Self::Sales => "Manage the full sales cycle and grow a book of business",
            Self::General => "Deliver on the goals of the role alongside the wider team",
        }
    }

    fn weights(&self) -> SearchWeights {
        match self {
            Self::Design => SearchWeights::new(45, 35, 20),
            Self::Sales => SearchWeights::new(35, 45, 20),
            _ => SearchWeights::new(50, 30, 20),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seniority {
    Junior,
    Mid,
    Senior,
    Staff,
}

impl Seniority {
    fn experience(&self) -> ExperienceRange {
        match self {
            Self::Junior => ExperienceRange::new(0, 2),
            Self::Mid => ExperienceRange::new(2, 5),
            Self::Senior => ExperienceRange::new(5, 10),
            Self::Staff => ExperienceRange::new(8, 15),
        }
    }

    fn salary(&self) -> SalaryRange {
        match self {
            Self::Junior => SalaryRange::usd(80_000, 110_000),
            Self::Mid => SalaryRange::usd(110_000, 150_000),
            Self::Senior => SalaryRange::usd(150_000, 200_000),
            Self::Staff => SalaryRange::usd(190_000, 260_000),
        }
    }

    fn title_prefix(&self) -> Option<&'static str> {
        match self {
            Self::Junior => Some("Junior"),
            Self::Mid => None,
            Self::Senior => Some("Senior"),
            Self::Staff => Some("Staff"),
        }
    }
}

/// (canonical name, lowercase aliases). Aliases with a space match as phrases.
const SKILL_CATALOG: &[(&str, &[&str])] = &[
    ("React", &["react", "reactjs", "react.js"]),
    ("TypeScript", &["typescript"]),
    ("JavaScript", &["javascript", "js"]),
    ("Node.js", &["node", "nodejs", "node.js"]),
    ("Python", &["python"]),
    ("Rust", &["rust"]),
    ("Go", &["golang"]),
    ("Java", &["java"]),
    ("Kotlin", &["kotlin"]),
    ("Swift", &["swift"]),
    ("AWS", &["aws"]),
    ("Kubernetes", &["kubernetes", "k8s"]),
    ("Docker", &["docker"]),
    ("PostgreSQL", &["postgres", "postgresql"]),
    ("SQL", &["sql"]),
    ("GraphQL", &["graphql"]),
    ("Figma", &["figma"]),
    ("Machine Learning", &["machine learning", "ml"]),
    ("Salesforce", &["salesforce"]),
];

const CITIES: &[&str] = &[
    "San Francisco",
    "New York",
    "London",
    "Berlin",
    "Austin",
    "Seattle",
    "Boston",
    "Toronto",
    "Paris",
    "Amsterdam",
];

/// Everything the heuristics read out of one piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct Signals {
    pub template: RoleTemplate,
    pub seniority: Option<Seniority>,
    pub explicit_years: Option<u8>,
    pub skills: Vec<String>,
    pub work_mode: Option<WorkMode>,
    pub city: Option<String>,
    pub organization: Option<String>,
    pub specialty: Option<&'static str>,
    pub wants_startups: bool,
    pub wants_big_tech: bool,
}

impl Signals {
    fn experience(&self) -> Option<ExperienceRange> {
        match (self.explicit_years, self.seniority) {
            (Some(years), _) => Some(ExperienceRange::new(years, years.saturating_add(5))),
            (None, Some(seniority)) => Some(seniority.experience()),
            (None, None) => None,
        }
    }

    fn title(&self) -> Option<String> {
        let base = match (self.template, self.specialty) {
            (RoleTemplate::Engineering, Some(specialty)) => specialty,
            (template, _) => template.base_title()?,
        };
        Some(match self.seniority.and_then(|s| s.title_prefix()) {
            Some(prefix) => format!("{} {}", prefix, base),
            None => base.to_string(),
        })
    }

    fn location(&self) -> Option<String> {
        match (&self.city, self.work_mode) {
            (Some(city), Some(WorkMode::Remote)) => Some(format!("{} (Remote)", city)),
            (Some(city), _) => Some(city.clone()),
            (None, Some(WorkMode::Remote)) => Some("Remote".to_string()),
            (None, _) => None,
        }
    }
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#' || c == '.' || c == '-'))
        .map(|t| t.trim_matches(|c| c == '.' || c == '-').to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn mentions(lower: &str, tokens: &[String], alias: &str) -> bool {
    if alias.contains(' ') {
        lower.contains(alias)
    } else {
        tokens.iter().any(|t| t == alias)
    }
}

fn any_token(tokens: &[String], words: &[&str]) -> bool {
    tokens.iter().any(|t| words.contains(&t.as_str()))
}

pub fn detect_template(text: &str) -> RoleTemplate {
    let lower = text.to_lowercase();
    let toks = tokens(text);
    let has = |words: &[&str]| words.iter().any(|w| mentions(&lower, &toks, w));

    if has(&["engineer", "engineers", "developer", "developers", "programmer", "swe"]) {
        RoleTemplate::Engineering
    } else if has(&["designer", "design", "ux", "ui"]) {
        RoleTemplate::Design
    } else if has(&["product manager", "pm"]) {
        RoleTemplate::Product
    } else if has(&["data scientist", "data analyst", "analyst", "machine learning"]) {
        RoleTemplate::Data
    } else if has(&["sales", "account executive", "sdr", "bdr"]) {
        RoleTemplate::Sales
    } else {
        RoleTemplate::General
    }
}

fn detect_seniority(tokens: &[String]) -> Option<Seniority> {
    if any_token(tokens, &["staff", "principal", "lead"]) {
        Some(Seniority::Staff)
    } else if any_token(tokens, &["senior", "sr"]) {
        Some(Seniority::Senior)
    } else if any_token(tokens, &["junior", "jr", "entry-level", "graduate"]) {
        Some(Seniority::Junior)
    } else if any_token(tokens, &["mid", "mid-level", "intermediate"]) {
        Some(Seniority::Mid)
    } else {
        None
    }
}

/// "5+ years", "7 years", "3 yrs".
fn detect_years(tokens: &[String]) -> Option<u8> {
    tokens.windows(2).find_map(|pair| {
        let unit = pair[1].as_str();
        if !matches!(unit, "years" | "year" | "yrs" | "yr") {
            return None;
        }
        pair[0].trim_end_matches('+').parse::<u8>().ok().filter(|y| *y <= 40)
    })
}

fn detect_skills(lower: &str, tokens: &[String]) -> Vec<String> {
    SKILL_CATALOG
        .iter()
        .filter(|(_, aliases)| aliases.iter().any(|a| mentions(lower, tokens, a)))
        .map(|(name, _)| name.to_string())
        .collect()
}

fn detect_work_mode(lower: &str, tokens: &[String]) -> Option<WorkMode> {
    if any_token(tokens, &["remote", "remote-first", "distributed"]) {
        Some(WorkMode::Remote)
    } else if any_token(tokens, &["hybrid"]) {
        Some(WorkMode::Hybrid)
    } else if any_token(tokens, &["onsite", "on-site"]) || lower.contains("in office") {
        Some(WorkMode::Onsite)
    } else {
        None
    }
}

fn detect_city(lower: &str) -> Option<String> {
    CITIES
        .iter()
        .find(|city| lower.contains(&city.to_lowercase()))
        .map(|city| city.to_string())
}

fn detect_specialty(lower: &str, tokens: &[String]) -> Option<&'static str> {
    if any_token(tokens, &["frontend", "front-end"]) {
        Some("Frontend Engineer")
    } else if any_token(tokens, &["backend", "back-end"]) {
        Some("Backend Engineer")
    } else if any_token(tokens, &["fullstack", "full-stack"]) || lower.contains("full stack") {
        Some("Full Stack Engineer")
    } else if any_token(tokens, &["mobile", "ios", "android"]) {
        Some("Mobile Engineer")
    } else {
        None
    }
}

/// Capitalised words right after "at"/"for", e.g. "engineer at Acme Labs".
fn detect_organization(text: &str) -> Option<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    for (i, word) in words.iter().enumerate() {
        if !matches!(word.to_lowercase().as_str(), "at" | "for") {
            continue;
        }
        let name: Vec<&str> = words[i + 1..]
            .iter()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '&'))
            .take_while(|w| w.chars().next().is_some_and(|c| c.is_uppercase()))
            .take(3)
            .collect();
        let candidate = name.join(" ");
        let is_skill = SKILL_CATALOG
            .iter()
            .any(|(skill, _)| skill.eq_ignore_ascii_case(&candidate));
        if !candidate.is_empty() && !is_skill && !CITIES.contains(&candidate.as_str()) {
            return Some(candidate);
        }
    }
    None
}

pub fn read_signals(text: &str) -> Signals {
    let lower = text.to_lowercase();
    let toks = tokens(text);
    Signals {
        template: detect_template(text),
        seniority: detect_seniority(&toks),
        explicit_years: detect_years(&toks),
        skills: detect_skills(&lower, &toks),
        work_mode: detect_work_mode(&lower, &toks),
        city: detect_city(&lower),
        organization: detect_organization(text),
        specialty: detect_specialty(&lower, &toks),
        wants_startups: any_token(&toks, &["startup", "startups", "start-up"]),
        wants_big_tech: any_token(&toks, &["faang", "enterprise"]) || lower.contains("big tech"),
    }
}

/// Structured fields for a first-pass parse of raw input. Every field the
/// heuristics can fill is filled, falling back to the template's defaults.
pub fn extract_fields(text: &str) -> JobSpecPatch {
    let signals = read_signals(text);
    let template = signals.template;

    let primary_skills = if signals.skills.is_empty() {
        template
            .default_skills()
            .iter()
            .take(2)
            .map(|s| s.to_string())
            .collect()
    } else {
        signals.skills.clone()
    };
    let secondary_skills = template
        .default_skills()
        .iter()
        .map(|s| s.to_string())
        .filter(|s| !primary_skills.contains(s))
        .take(3)
        .collect();
    let seniority = signals.seniority.unwrap_or(Seniority::Mid);

    JobSpecPatch {
        title: signals.title(),
        organization: signals.organization.clone(),
        description: Some(text.trim().to_string()),
        responsibilities: Some(template.responsibilities().to_string()),
        requirements: Some(requirements_text(&primary_skills, &signals)),
        primary_skills: Some(primary_skills),
        secondary_skills: Some(secondary_skills),
        experience: Some(signals.experience().unwrap_or(ExperienceRange::new(3, 7))),
        location: Some(signals.location().unwrap_or_else(|| "Flexible".to_string())),
        work_mode: Some(signals.work_mode.unwrap_or(WorkMode::Hybrid)),
        salary: Some(seniority.salary()),
    }
}

fn requirements_text(skills: &[String], signals: &Signals) -> String {
    let experience = signals.experience().unwrap_or(ExperienceRange::new(3, 7));
    format!(
        "{}+ years of relevant experience; strong {}",
        experience.min_years,
        skills.join(", ")
    )
}

/// Merge extracted fields into a specification. Title and organization are
/// only taken when the specification still carries placeholders.
pub fn apply_extraction(spec: &mut JobSpecification, patch: &JobSpecPatch) {
    let mut patch = patch.clone();
    if !spec.has_placeholder_title() {
        patch.title = None;
    }
    if !spec.has_placeholder_organization() {
        patch.organization = None;
    }
    spec.apply(&patch);
}

fn summary(spec: &JobSpecification, filters: &SearchFilters) -> String {
    format!(
        "{} at {}: {}-{} years of experience, {}, skilled in {}",
        spec.title,
        spec.organization,
        filters.experience.min_years,
        filters.experience.max_years,
        filters.location,
        filters.skills.join(", ")
    )
}

fn relevant_titles(spec: &JobSpecification, template: RoleTemplate) -> Vec<String> {
    let mut titles = vec![spec.title.clone()];
    if let Some(base) = template.base_title() {
        for candidate in [
            base.to_string(),
            format!("Senior {}", base),
            format!("Lead {}", base),
        ] {
            if !titles.contains(&candidate) {
                titles.push(candidate);
            }
        }
    }
    titles
}

fn company_list(signals: &Signals) -> Vec<String> {
    let companies: &[&str] = if signals.wants_startups {
        &STARTUP_COMPANIES
    } else if signals.wants_big_tech {
        &BIG_TECH_COMPANIES
    } else {
        signals.template.companies()
    };
    companies.iter().map(|c| c.to_string()).collect()
}

/// First search plan for a specification whose fields came from `raw_text`.
pub fn build_plan(spec: &JobSpecification, raw_text: &str) -> SearchPlan {
    let signals = read_signals(raw_text);

    let mut skills = spec.primary_skills.clone();
    for skill in &spec.secondary_skills {
        if !skills.contains(skill) {
            skills.push(skill.clone());
        }
    }

    let filters = SearchFilters {
        experience: spec.experience.unwrap_or(ExperienceRange::new(3, 7)),
        location: spec
            .location
            .clone()
            .unwrap_or_else(|| "Flexible".to_string()),
        salary: spec
            .salary
            .unwrap_or(Seniority::Mid.salary()),
        skills,
    };

    let mut weights = signals.template.weights();
    if spec.work_mode == Some(WorkMode::Remote) {
        weights = weights.favour_skills(10);
    }

    SearchPlan {
        job_summary: summary(spec, &filters),
        target_companies: company_list(&signals),
        relevant_titles: relevant_titles(spec, signals.template),
        filters,
        weights,
        revision: 1,
    }
}

/// Only the fields a refinement message actually mentions.
pub fn refinement_patch(text: &str) -> JobSpecPatch {
    let signals = read_signals(text);
    JobSpecPatch {
        experience: signals.experience(),
        location: signals.location(),
        work_mode: signals.work_mode,
        salary: signals.seniority.map(|s| s.salary()),
        ..JobSpecPatch::default()
    }
}

/// Replacement plan after the reviewer asks for changes. The previous plan is
/// the starting point; mentioned keywords swap whole sections.
pub fn refine_plan(previous: &SearchPlan, spec: &JobSpecification, text: &str) -> SearchPlan {
    let signals = read_signals(text);
    let mut next = previous.clone();

    if signals.wants_startups || signals.wants_big_tech {
        next.target_companies = company_list(&signals);
    }
    for skill in &signals.skills {
        if !next.filters.skills.contains(skill) {
            next.filters.skills.push(skill.clone());
        }
    }
    if let Some(experience) = signals.experience() {
        next.filters.experience = experience;
    }
    if let Some(seniority) = signals.seniority {
        next.filters.salary = seniority.salary();
    }
    if let Some(location) = signals.location() {
        next.filters.location = location;
    }
    if signals.work_mode == Some(WorkMode::Remote) && previous.filters.location != "Remote" {
        next.weights = next.weights.favour_skills(10);
    }

    next.job_summary = summary(spec, &next.filters);
    next.revision = previous.revision + 1;
    next
}
