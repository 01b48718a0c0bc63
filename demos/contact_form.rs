//! Contact form walkthrough.
//!
//! Drives one form through every outcome: a bot submission, field errors,
//! an accepted submission, and the rate limit kicking in.

use form_guard::{Field, FormController, FormPhase, SimulatedSubmitter, SubmitOutcome, Submission};
use std::time::Duration;
use tracing::Level;

fn report(label: &str, outcome: &SubmitOutcome) {
    println!("{}:", label);
    match outcome {
        SubmitOutcome::Submitted => println!("  sent, thank you"),
        SubmitOutcome::BotDiscarded => println!("  (silently discarded)"),
        SubmitOutcome::RateLimited { message } => println!("  {}", message),
        SubmitOutcome::Invalid(errors) => {
            for field in Field::ALL {
                if let Some(message) = errors.message(field) {
                    println!("  {}", message);
                }
            }
        }
        SubmitOutcome::Failed(error) => println!("  {}", error),
        SubmitOutcome::Busy => println!("  still sending"),
    }
    println!();
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let form = FormController::builder()
        .with_rate_limit(2, Duration::from_secs(15 * 60))
        .build(SimulatedSubmitter::with_latency(Duration::from_millis(300)))
        .expect("valid configuration");

    println!("=== Contact Form Example ===\n");
    println!("Honeypot field: {}\n", form.honeypot().to_html());

    form.fill(
        Submission::new("Spam Bot", "bot@spam.example", "Offer", "Visit our site today!")
            .with_honeypot("http://spam.example"),
    );
    report("Bot fills the hidden field", &form.submit().await);

    form.fill(Submission::new(
        "J",
        "j@@example",
        "Hello",
        "<script>alert('hi')</script> Hello there!",
    ));
    report("Malformed submission", &form.submit().await);

    form.set_field(Field::Name, "Jane Doe");
    form.set_field(Field::Email, "jane@example.com");
    form.set_field(Field::Message, "I would like to know more about your services.");
    report("Corrected submission", &form.submit().await);
    println!("Phase after sending: {:?}\n", form.phase());

    form.fill(Submission::new(
        "Jane Doe",
        "jane@example.com",
        "Follow-up",
        "Just checking you received my last message.",
    ));
    report("Third attempt within the window", &form.submit().await);
    assert_eq!(form.phase(), FormPhase::Error);

    let snapshot = form.metrics().snapshot();
    println!("=== Metrics ===");
    println!("accepted:            {}", snapshot.submissions_accepted);
    println!("bots trapped:        {}", snapshot.bots_trapped);
    println!("validation failures: {}", snapshot.validation_failures);
    println!("rate limited:        {}", snapshot.rate_limited);
}
