//! Fixed topic taxonomy and the market-opportunity text built from it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::keywords::contains_phrase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    AiAutomation,
    ECommerce,
    ContentCreation,
    Freelancing,
    Investment,
    DigitalProducts,
    AffiliateMarketing,
    RealEstate,
    #[serde(rename = "OTHER")]
    Other,
}

/// Lookup order matters: the first category with a matching keyword wins.
const TAXONOMY: &[(Category, &[&str])] = &[
    (
        Category::AiAutomation,
        &[
            "ai", "artificial intelligence", "automation", "automate", "automated", "chatgpt",
            "gpt", "llm", "machine learning", "bot", "bots", "agent", "agents",
        ],
    ),
    (
        Category::ECommerce,
        &[
            "ecommerce", "e commerce", "dropshipping", "amazon", "shopify", "etsy",
            "online store", "selling", "print on demand",
        ],
    ),
    (
        Category::ContentCreation,
        &[
            "youtube", "tiktok", "instagram", "content", "creator", "creators", "influencer",
            "video", "videos", "blog", "blogging", "podcast", "newsletter",
        ],
    ),
    (
        Category::Freelancing,
        &[
            "freelance", "freelancing", "freelancer", "upwork", "fiverr", "remote work",
            "consulting", "services", "gig",
        ],
    ),
    (
        Category::Investment,
        &[
            "stocks", "crypto", "investment", "investing", "trading", "dividends", "dividend",
            "portfolio", "etf",
        ],
    ),
    (
        Category::DigitalProducts,
        &[
            "course", "courses", "ebook", "software", "app", "saas", "template", "templates",
            "printables", "digital product", "digital products",
        ],
    ),
    (
        Category::AffiliateMarketing,
        &["affiliate", "affiliates", "affiliate marketing", "commission", "referral"],
    ),
    (
        Category::RealEstate,
        &[
            "real estate", "rental", "rentals", "airbnb", "property", "properties", "landlord",
            "reit",
        ],
    ),
];

impl Category {
    /// Category of `topic`; [`Category::Other`] when nothing matches.
    #[must_use]
    pub fn classify(topic: &str) -> Self {
        TAXONOMY
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| contains_phrase(topic, k)))
            .map_or(Category::Other, |(category, _)| *category)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::AiAutomation => "ai-automation",
            Category::ECommerce => "e-commerce",
            Category::ContentCreation => "content-creation",
            Category::Freelancing => "freelancing",
            Category::Investment => "investment",
            Category::DigitalProducts => "digital-products",
            Category::AffiliateMarketing => "affiliate-marketing",
            Category::RealEstate => "real-estate",
            Category::Other => "OTHER",
        }
    }

    fn opportunity(self) -> &'static str {
        match self {
            Category::AiAutomation => {
                "Demand for AI tools and automation services is rising; suited to building products or offering consulting"
            }
            Category::ECommerce => {
                "E-commerce is crowded but rich in openings; suited to product sales or seller services"
            }
            Category::ContentCreation => {
                "The creator market is active; suited to creator tooling or training"
            }
            Category::Freelancing => {
                "Freelance demand is growing; suited to skill-based services or marketplace tooling"
            }
            Category::Investment => {
                "Demand for investing education and tools is steady; suited to paid knowledge products or tooling"
            }
            Category::DigitalProducts => {
                "Digital products keep growing; suited to courses, software or template sales"
            }
            Category::AffiliateMarketing => {
                "Affiliate programs reward trusted reviews; suited to comparison content and niche sites"
            }
            Category::RealEstate => {
                "Property income attracts steady interest; suited to rental guides and analysis tools"
            }
            Category::Other => "Emerging opportunity that needs further research",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category sentence, qualified by engagement, reach and growth.
#[must_use]
pub fn market_opportunity(
    category: Category,
    total_engagement: u64,
    platform_count: usize,
    growth_rate: f64,
) -> String {
    let mut text = category.opportunity().to_string();
    if total_engagement > 1_000 {
        text.push_str("; audience engagement is high");
    }
    if platform_count >= 3 {
        text.push_str("; interest spans several platforms");
    }
    if growth_rate > 0.5 {
        text.push_str("; growth is clearly accelerating");
    }
    text.push('.');
    text
}
