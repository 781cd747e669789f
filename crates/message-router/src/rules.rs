//! Keyword vocabularies and template names used for routing.
//!
//! [`RoutingRules`] is built once at startup and shared read-only by the
//! engine and the built-in smart router.

use crate::decision::WELCOME_TEMPLATE;

/// Keywords that select one target (payload code or template name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRoute {
    /// Intent or category name, for reasoning strings.
    pub name: String,
    /// Lowercase substrings; any hit selects the route.
    pub keywords: Vec<String>,
    /// Interactive payload code or template name.
    pub target: String,
}

impl KeywordRoute {
    fn new(name: &str, keywords: &[&str], target: &str) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            target: target.to_string(),
        }
    }

    /// Keywords of this route found in an already-lowercased message.
    pub fn matches<'a>(&'a self, lower_message: &str) -> Vec<&'a str> {
        self.keywords
            .iter()
            .filter(|keyword| lower_message.contains(keyword.as_str()))
            .map(String::as_str)
            .collect()
    }
}

/// A scored domain for the built-in smart template router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRule {
    pub domain: String,
    pub keywords: Vec<String>,
    /// Candidate templates, best default first.
    pub templates: Vec<String>,
    /// Score multiplier per keyword hit.
    pub priority: u32,
    pub fallback: String,
    /// Domain gets a bonus when the user has a driver profile.
    pub requires_driver_profile: bool,
}

impl DomainRule {
    fn new(
        domain: &str,
        keywords: &[&str],
        templates: &[&str],
        priority: u32,
        requires_driver_profile: bool,
    ) -> Self {
        Self {
            domain: domain.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            templates: templates.iter().map(|t| t.to_string()).collect(),
            priority,
            fallback: templates[0].to_string(),
            requires_driver_profile,
        }
    }

    /// Keywords of this domain found in an already-lowercased message.
    pub fn matches<'a>(&'a self, lower_message: &str) -> Vec<&'a str> {
        self.keywords
            .iter()
            .filter(|keyword| lower_message.contains(keyword.as_str()))
            .map(String::as_str)
            .collect()
    }
}

/// Immutable routing configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingRules {
    /// Interactive menu payloads, checked in order.
    pub interactive_routes: Vec<KeywordRoute>,
    pub default_interactive_payload: String,
    /// Local fallback intent categories, checked in order.
    pub intent_routes: Vec<KeywordRoute>,
    /// Status words that send driver users to the driver-status template.
    pub driver_status_keywords: Vec<String>,
    pub driver_status_template: String,
    pub welcome_template: String,
    pub main_menu_template: String,
    pub support_template: String,
    /// Domains scored by the built-in smart router.
    pub domain_rules: Vec<DomainRule>,
}

impl Default for RoutingRules {
    fn default() -> Self {
        Self {
            interactive_routes: vec![
                KeywordRoute::new("payment", &["pay"], "PAYMENT_MENU"),
                KeywordRoute::new("ride", &["ride", "taxi"], "RIDE_MENU"),
                KeywordRoute::new("property", &["property"], "PROPERTY_MENU"),
                KeywordRoute::new("vehicle", &["vehicle"], "VEHICLE_MENU"),
                KeywordRoute::new("order", &["order"], "ORDER_MENU"),
                KeywordRoute::new("help", &["help"], "HELP_MENU"),
            ],
            default_interactive_payload: "MAIN_MENU".to_string(),
            intent_routes: vec![
                KeywordRoute::new(
                    "payment",
                    &["pay", "momo", "money", "transfer", "qr"],
                    "tpl_payments_quick_v1",
                ),
                KeywordRoute::new(
                    "driver",
                    &["driver", "moto", "transport"],
                    "tpl_driver_status_v1",
                ),
                KeywordRoute::new(
                    "property",
                    &["property", "house", "rent", "apartment", "land"],
                    "tpl_property_quick_v1",
                ),
                KeywordRoute::new(
                    "vehicle",
                    &["vehicle", "car", "auto", "bike"],
                    "tpl_vehicle_quick_v1",
                ),
                KeywordRoute::new(
                    "ride",
                    &["ride", "taxi", "pickup", "trip"],
                    "tpl_passenger_quick_v1",
                ),
                KeywordRoute::new(
                    "support",
                    &["help", "support", "problem", "issue", "human"],
                    "tpl_support_quick_v1",
                ),
            ],
            driver_status_keywords: ["status", "online", "offline", "available", "busy"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
            driver_status_template: "tpl_driver_status_v1".to_string(),
            welcome_template: WELCOME_TEMPLATE.to_string(),
            main_menu_template: "tpl_main_menu_v1".to_string(),
            support_template: "tpl_support_quick_v1".to_string(),
            domain_rules: default_domain_rules(),
        }
    }
}

fn default_domain_rules() -> Vec<DomainRule> {
    vec![
        DomainRule::new(
            "payment",
            &[
                "pay", "payment", "momo", "money", "qr", "generate", "scan", "amount", "rwf",
                "send money", "transfer",
            ],
            &[
                "tpl_payments_quick_v1",
                "tpl_payment_confirmation_v1",
                "tpl_payment_status_v1",
            ],
            10,
            false,
        ),
        DomainRule::new(
            "driver",
            &[
                "driver", "online", "offline", "available", "busy", "status", "location", "moto",
                "car", "transport",
            ],
            &[
                "tpl_driver_status_v1",
                "tpl_driver_earnings_v1",
                "tpl_driver_location_v1",
            ],
            9,
            true,
        ),
        DomainRule::new(
            "property",
            &[
                "house", "rent", "property", "apartment", "home", "listing", "real estate", "land",
                "room",
            ],
            &[
                "tpl_property_quick_v1",
                "tpl_property_listing_v1",
                "tpl_property_search_v1",
            ],
            8,
            false,
        ),
        DomainRule::new(
            "vehicle",
            &[
                "car", "vehicle", "sell car", "buy car", "moto sale", "auto", "bike", "motorcycle",
            ],
            &[
                "tpl_vehicle_quick_v1",
                "tpl_vehicle_listing_v1",
                "tpl_vehicle_valuation_v1",
            ],
            8,
            false,
        ),
        DomainRule::new(
            "ride",
            &[
                "ride", "taxi", "pickup", "drop", "book", "trip", "passenger", "destination",
            ],
            &[
                "tpl_passenger_quick_v1",
                "tpl_ride_booking_v1",
                "tpl_trip_status_v1",
            ],
            7,
            false,
        ),
        DomainRule::new(
            "commerce",
            &[
                "order", "buy", "shop", "pharmacy", "food", "drink", "store", "market", "product",
            ],
            &[
                "tpl_ordering_quick_v1",
                "tpl_pharmacy_quick_v1",
                "tpl_market_menu_v1",
            ],
            6,
            false,
        ),
        DomainRule::new(
            "support",
            &[
                "help", "support", "problem", "issue", "talk", "human", "assistance", "question",
            ],
            &["tpl_support_quick_v1", "tpl_escalation_v1", "tpl_faq_v1"],
            5,
            false,
        ),
    ]
}
