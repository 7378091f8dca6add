//! Built-in fallback fixtures

use serde_json::json;
use std::sync::Arc;

use crate::generator::{FallbackGenerator, ReferralCodeGenerator, StaticFixture};
use crate::shape::{FixtureShape, JsonKind};

pub const WAGTAIL_HOMEPAGE: &str = "wagtail.homepage";
pub const TENANT_DASHBOARD: &str = "tenant.dashboard";
pub const SALEOR_PRODUCTS: &str = "saleor.products";
pub const BILLING_INVOICES: &str = "billing.invoices";
pub const SECURITY_EVENTS: &str = "security.events";
pub const CRM_LEADS: &str = "crm.leads";
pub const GAMIFICATION_LEADERBOARD: &str = "gamification.leaderboard";
pub const GAMIFICATION_REFERRAL_CODE: &str = "gamification.referral_code";
pub const DIRECTORY_BUSINESSES: &str = "directory.businesses";
pub const DASHBOARD_HEALTH: &str = "dashboard.health";
pub const DASHBOARD_TIERS: &str = "dashboard.tiers";
pub const DASHBOARD_SERVICES: &str = "dashboard.services";
pub const DASHBOARD_METRICS: &str = "dashboard.metrics";

/// Every built-in fixture, in registration order
pub fn builtin() -> Vec<(&'static str, Arc<dyn FallbackGenerator>)> {
    vec![
        (WAGTAIL_HOMEPAGE, Arc::new(wagtail_homepage())),
        (TENANT_DASHBOARD, Arc::new(tenant_dashboard())),
        (SALEOR_PRODUCTS, Arc::new(saleor_products())),
        (BILLING_INVOICES, Arc::new(billing_invoices())),
        (SECURITY_EVENTS, Arc::new(security_events())),
        (CRM_LEADS, Arc::new(crm_leads())),
        (GAMIFICATION_LEADERBOARD, Arc::new(gamification_leaderboard())),
        (
            GAMIFICATION_REFERRAL_CODE,
            Arc::new(ReferralCodeGenerator::default()),
        ),
        (DIRECTORY_BUSINESSES, Arc::new(directory_businesses())),
        (DASHBOARD_HEALTH, Arc::new(dashboard_health())),
        (DASHBOARD_TIERS, Arc::new(dashboard_tiers())),
        (DASHBOARD_SERVICES, Arc::new(dashboard_services())),
        (DASHBOARD_METRICS, Arc::new(dashboard_metrics())),
    ]
}

fn wagtail_homepage() -> StaticFixture {
    StaticFixture::new(
        FixtureShape::new()
            .field("homepage", JsonKind::Object)
            .field("homepage.title", JsonKind::String)
            .field("homepage.hero", JsonKind::Object)
            .field("homepage.sections", JsonKind::Array),
        json!({
            "homepage": {
                "id": 3,
                "title": "Bizoholic - AI-Powered Marketing",
                "slug": "home",
                "hero": {
                    "headline": "Marketing that runs itself",
                    "subheadline": "AI agents plan, launch and optimise your campaigns around the clock.",
                    "cta_text": "Start Free Trial",
                    "cta_url": "/signup"
                },
                "sections": [
                    {
                        "type": "features",
                        "title": "Everything your marketing team needs",
                        "items": [
                            {"title": "Campaign Automation", "description": "Launch multi-channel campaigns in minutes."},
                            {"title": "Lead Scoring", "description": "Prioritise the leads most likely to convert."},
                            {"title": "SEO Insights", "description": "Continuous audits with actionable fixes."}
                        ]
                    },
                    {
                        "type": "testimonials",
                        "title": "Trusted by growing businesses",
                        "items": []
                    }
                ],
                "seo": {
                    "meta_title": "Bizoholic - AI-Powered Marketing",
                    "meta_description": "AI-powered marketing automation for small and medium businesses."
                }
            }
        }),
    )
}

fn tenant_dashboard() -> StaticFixture {
    StaticFixture::new(
        FixtureShape::new()
            .field("tenant_id", JsonKind::String)
            .field("tenant_name", JsonKind::String)
            .field("metrics", JsonKind::Object)
            .field("features", JsonKind::Array)
            .field("recent_activity", JsonKind::Array)
            .field("ai_insights", JsonKind::Array),
        json!({
            "tenant_id": "demo-tenant",
            "tenant_name": "Demo Business",
            "industry": "marketing",
            "metrics": {
                "total_leads": 1247,
                "active_campaigns": 8,
                "conversion_rate": 3.8,
                "monthly_revenue": 45230.5
            },
            "features": ["crm", "campaigns", "analytics", "ai_agents"],
            "recent_activity": [
                {
                    "id": "act-1",
                    "type": "campaign",
                    "description": "Summer promotion campaign launched",
                    "timestamp": "2024-06-01T09:00:00Z"
                },
                {
                    "id": "act-2",
                    "type": "lead",
                    "description": "12 new leads captured from landing page",
                    "timestamp": "2024-06-01T11:30:00Z"
                }
            ],
            "ai_insights": [
                {
                    "title": "Email open rates are trending up",
                    "description": "Tuesday morning sends outperform other slots by 18%.",
                    "priority": "medium"
                }
            ]
        }),
    )
}

fn saleor_products() -> StaticFixture {
    StaticFixture::new(
        FixtureShape::new()
            .field("products", JsonKind::Array)
            .field("total_count", JsonKind::Number)
            .field("page_info", JsonKind::Object),
        json!({
            "products": [
                {
                    "id": "UHJvZHVjdDox",
                    "name": "Wireless Earbuds Pro",
                    "slug": "wireless-earbuds-pro",
                    "category": "electronics",
                    "price": {"amount": 79.99, "currency": "USD"},
                    "in_stock": true,
                    "thumbnail": "/images/products/earbuds.jpg"
                },
                {
                    "id": "UHJvZHVjdDoy",
                    "name": "Smart Fitness Watch",
                    "slug": "smart-fitness-watch",
                    "category": "wearables",
                    "price": {"amount": 149.0, "currency": "USD"},
                    "in_stock": true,
                    "thumbnail": "/images/products/watch.jpg"
                },
                {
                    "id": "UHJvZHVjdDoz",
                    "name": "Portable Blender",
                    "slug": "portable-blender",
                    "category": "home",
                    "price": {"amount": 34.5, "currency": "USD"},
                    "in_stock": false,
                    "thumbnail": "/images/products/blender.jpg"
                }
            ],
            "total_count": 3,
            "page_info": {"has_next_page": false, "end_cursor": null}
        }),
    )
}

fn billing_invoices() -> StaticFixture {
    StaticFixture::new(
        FixtureShape::new()
            .field("invoices", JsonKind::Array)
            .field("total", JsonKind::Number)
            .field("summary", JsonKind::Object),
        json!({
            "invoices": [
                {
                    "id": "INV-2024-001",
                    "status": "paid",
                    "amount": 299.0,
                    "currency": "USD",
                    "issued_at": "2024-05-01",
                    "due_at": "2024-05-15"
                },
                {
                    "id": "INV-2024-002",
                    "status": "pending",
                    "amount": 299.0,
                    "currency": "USD",
                    "issued_at": "2024-06-01",
                    "due_at": "2024-06-15"
                }
            ],
            "total": 2,
            "summary": {"outstanding": 299.0, "paid_this_year": 1495.0, "currency": "USD"}
        }),
    )
}

fn security_events() -> StaticFixture {
    StaticFixture::new(
        FixtureShape::new()
            .field("events", JsonKind::Array)
            .field("summary", JsonKind::Object)
            .field("summary.threat_level", JsonKind::String),
        json!({
            "events": [
                {
                    "id": "sec-1",
                    "type": "login_failed",
                    "severity": "low",
                    "ip_address": "203.0.113.24",
                    "description": "3 failed login attempts",
                    "timestamp": "2024-06-01T08:12:00Z"
                },
                {
                    "id": "sec-2",
                    "type": "api_key_rotated",
                    "severity": "info",
                    "ip_address": "198.51.100.7",
                    "description": "API key rotated by tenant admin",
                    "timestamp": "2024-06-01T10:45:00Z"
                }
            ],
            "summary": {"total_events": 2, "critical": 0, "threat_level": "low"}
        }),
    )
}

fn crm_leads() -> StaticFixture {
    StaticFixture::new(
        FixtureShape::new()
            .field("leads", JsonKind::Array)
            .field("total", JsonKind::Number),
        json!({
            "leads": [
                {
                    "id": "lead-1",
                    "first_name": "Priya",
                    "last_name": "Sharma",
                    "email": "priya@example.com",
                    "company": "Sharma Textiles",
                    "status": "qualified",
                    "score": 82,
                    "source": "website"
                },
                {
                    "id": "lead-2",
                    "first_name": "Daniel",
                    "last_name": "Ortiz",
                    "email": "daniel@example.com",
                    "company": "Ortiz Dental",
                    "status": "new",
                    "score": 45,
                    "source": "referral"
                }
            ],
            "total": 2,
            "page": 1
        }),
    )
}

fn gamification_leaderboard() -> StaticFixture {
    StaticFixture::new(
        FixtureShape::new()
            .field("leaderboard", JsonKind::Array)
            .field("period", JsonKind::String),
        json!({
            "leaderboard": [
                {"rank": 1, "name": "Growth Hackers Inc", "points": 12450, "referrals": 34},
                {"rank": 2, "name": "Local Bakery Co", "points": 9870, "referrals": 21},
                {"rank": 3, "name": "Peak Fitness", "points": 7320, "referrals": 15}
            ],
            "period": "monthly"
        }),
    )
}

fn directory_businesses() -> StaticFixture {
    StaticFixture::new(
        FixtureShape::new()
            .field("businesses", JsonKind::Array)
            .field("total", JsonKind::Number)
            .field("categories", JsonKind::Array),
        json!({
            "businesses": [
                {
                    "id": "biz-1",
                    "name": "Green Leaf Cafe",
                    "category": "restaurants",
                    "city": "Austin",
                    "rating": 4.6,
                    "reviews": 128,
                    "verified": true
                },
                {
                    "id": "biz-2",
                    "name": "Brightside Plumbing",
                    "category": "home-services",
                    "city": "Denver",
                    "rating": 4.8,
                    "reviews": 76,
                    "verified": false
                }
            ],
            "total": 2,
            "categories": ["restaurants", "home-services", "health", "retail"]
        }),
    )
}

fn dashboard_health() -> StaticFixture {
    StaticFixture::new(
        FixtureShape::new()
            .field("status", JsonKind::String)
            .field("services", JsonKind::Object),
        json!({
            "status": "unknown",
            "services": {
                "brain_gateway": "unknown",
                "crm": "unknown",
                "cms": "unknown",
                "commerce": "unknown"
            }
        }),
    )
}

fn dashboard_tiers() -> StaticFixture {
    StaticFixture::new(
        FixtureShape::new().field("tiers", JsonKind::Array),
        json!({
            "tiers": [
                {"id": "starter", "name": "Starter", "price_monthly": 49, "agents": 3},
                {"id": "growth", "name": "Growth", "price_monthly": 149, "agents": 10},
                {"id": "scale", "name": "Scale", "price_monthly": 399, "agents": 28}
            ]
        }),
    )
}

fn dashboard_services() -> StaticFixture {
    StaticFixture::new(
        FixtureShape::new()
            .field("services", JsonKind::Array)
            .field("total", JsonKind::Number),
        json!({
            "services": [
                {"id": "seo", "name": "SEO Optimisation", "status": "available"},
                {"id": "ppc", "name": "Paid Advertising", "status": "available"},
                {"id": "social", "name": "Social Media Management", "status": "available"}
            ],
            "total": 3
        }),
    )
}

fn dashboard_metrics() -> StaticFixture {
    StaticFixture::new(
        FixtureShape::new()
            .field("metrics", JsonKind::Object)
            .field("metrics.active_tenants", JsonKind::Number),
        json!({
            "metrics": {
                "active_tenants": 0,
                "requests_today": 0,
                "avg_response_ms": 0
            }
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::FallbackContext;
    use bizosaas_core::tenant::TenantContext;

    #[test]
    fn test_every_builtin_matches_its_shape() {
        let ctx = FallbackContext::default();
        for (name, generator) in builtin() {
            let payload = generator.generate(&ctx);
            assert!(
                generator.shape().validate(&payload).is_ok(),
                "fixture {} violates its shape: {:?}",
                name,
                generator.shape().violations(&payload)
            );
        }
    }

    #[test]
    fn test_builtin_names_are_unique() {
        let mut names: Vec<_> = builtin().into_iter().map(|(n, _)| n).collect();
        let before = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), before);
    }

    #[test]
    fn test_homepage_title() {
        let payload = wagtail_homepage().generate(&FallbackContext::default());
        assert_eq!(
            payload["homepage"]["title"],
            json!("Bizoholic - AI-Powered Marketing")
        );
    }

    #[test]
    fn test_tenant_dashboard_is_a_tenant_context() {
        let payload = tenant_dashboard().generate(&FallbackContext::default());
        let ctx: TenantContext = serde_json::from_value(payload).unwrap();

        assert_eq!(ctx.tenant_id.as_str(), "demo-tenant");
        assert!(ctx.has_feature("crm"));
        assert_eq!(ctx.recent_activity.len(), 2);
    }

    #[test]
    fn test_fixtures_never_carry_source_tag() {
        // The envelope owns the `source` tag
        let ctx = FallbackContext::default();
        for (name, generator) in builtin() {
            let payload = generator.generate(&ctx);
            assert!(payload.get("source").is_none(), "fixture {} sets source", name);
        }
    }
}
