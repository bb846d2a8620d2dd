//! Deterministic fallback responder.
//!
//! When the live backend is unavailable (or a session has been degraded),
//! replies come from a fixed keyword-matched script. The responder is a
//! total function: any input, including the empty string, produces a reply.

/// System instructions sent to the live backend and reported to clients.
pub const SYSTEM_INSTRUCTIONS: &str = "You are an AI assistant specialized in Revolt Motors. You can only talk about:\n\
- Revolt Motors electric vehicles and motorcycles\n\
- Revolt Motors company information, history, and achievements\n\
- Revolt Motors product specifications, features, and benefits\n\
- Revolt Motors dealerships, service centers, and customer support\n\
- Electric vehicle technology as it relates to Revolt Motors\n\
- Sustainability and environmental benefits of Revolt Motors vehicles\n\n\
If asked about anything unrelated to Revolt Motors, politely redirect the \
conversation back to Revolt Motors topics. Always be helpful, informative, \
and enthusiastic about Revolt Motors products and services.";

/// Opening user turn used to seed live-backend history.
pub const GREETING_PROMPT: &str = "Hello, I'd like to learn about Revolt Motors.";

/// Opening assistant turn used to seed live-backend history.
pub const GREETING_REPLY: &str = "Hello! I'm excited to tell you all about Revolt Motors! \
We're India's first electric motorcycle manufacturer, revolutionizing the two-wheeler \
industry with cutting-edge electric technology. What would you like to know about our \
amazing electric motorcycles?";

/// Canned reply for the not-yet-implemented audio input endpoint.
pub const AUDIO_PLACEHOLDER: &str = "I received your audio input! Currently, this is a \
text-based interface, but audio integration is planned for the full live API \
implementation.";

const FLAGSHIP_REPLY: &str = "Revolt Motors is India's first electric motorcycle company! \
Our flagship RV400 is a fully electric motorcycle with a top speed of 85 km/h and a range \
of up to 150 km on a single charge. It features three riding modes, a swappable battery, \
and smart connectivity through the MyRevolt app. Would you like to know more about its \
specifications or where to find one?";

const SPECS_REPLY: &str = "The Revolt RV400 comes with a 3.24 kWh lithium-ion battery, a \
4.1 kW motor, and a range of up to 150 km. It charges fully in about 4.5 hours from a \
regular socket, and the battery is swappable at Revolt Switch stations. Riding modes Eco, \
Normal, and Sport let you balance range against performance. Anything specific you'd like \
to know about?";

const DEALER_REPLY: &str = "Revolt Motors has dealerships and service centers across major \
Indian cities including Delhi, Mumbai, Pune, Bengaluru, Hyderabad, Chennai, and Ahmedabad. \
You can locate your nearest dealership or book a test ride through the Revolt Motors \
website or the MyRevolt app. Our service network also supports doorstep assistance for \
routine maintenance.";

const TECH_REPLY: &str = "Revolt motorcycles are packed with smart technology: an \
AI-enabled connected platform, the MyRevolt app for remote diagnostics and bike tracking, \
swappable lithium-ion batteries, and customizable motor sounds. Over-the-air updates keep \
the bike improving after you buy it. The battery management system constantly optimizes \
range and cell health.";

const SUSTAIN_REPLY: &str = "Every Revolt motorcycle is a zero-tailpipe-emission vehicle. \
Switching from a petrol two-wheeler to an RV400 saves roughly a tonne of CO2 per year of \
typical commuting. Our swappable battery network extends battery life through managed \
charging, and we design packs for second-life reuse. Riding electric with Revolt is one of \
the simplest climate actions a commuter can take.";

const DEFAULT_REPLY: &str = "Thanks for your interest in Revolt Motors! We're India's \
leading electric motorcycle company, known for the RV400. I can tell you about our bikes, \
their specifications, our technology, dealerships, or the environmental benefits of going \
electric. What would you like to know?";

/// Ordered keyword groups. First group with any case-insensitive substring
/// match wins; later groups are not consulted.
const KEYWORD_REPLIES: &[(&[&str], &str)] = &[
    (&["electric", "motorcycle"], FLAGSHIP_REPLY),
    (&["spec", "feature", "battery", "range"], SPECS_REPLY),
    (&["dealer", "service", "where", "location"], DEALER_REPLY),
    (&["technology", "tech", "battery", "smart"], TECH_REPLY),
    (&["sustain", "environment", "green", "eco"], SUSTAIN_REPLY),
];

/// Keyword-matched canned responder.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackResponder;

impl FallbackResponder {
    /// Creates a responder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Produces a reply for the message. Total over any input string.
    #[must_use]
    pub fn respond(&self, message: &str) -> &'static str {
        let lowered = message.to_lowercase();
        for (keywords, reply) in KEYWORD_REPLIES {
            if keywords.iter().any(|keyword| lowered.contains(keyword)) {
                return reply;
            }
        }
        DEFAULT_REPLY
    }
}
