use colored::Colorize;
use cmclient::Request;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a step indicator
pub fn step(num: usize, total: usize, msg: &str) {
    println!("{} {}", format!("[{}/{}]", num, total).blue().bold(), msg);
}

/// Echo a request that was recorded instead of sent.
pub fn simulated_request(request: &Request) {
    println!(
        "  {} {} {}",
        "↪".magenta(),
        request.method.as_str().bold(),
        request.url
    );
    if let Some(body) = request.pretty_body() {
        for line in body.lines() {
            println!("      {}", line.dimmed());
        }
    }
}

/// Format a list of hosts for one-line display, eliding the tail.
pub fn host_summary(hosts: &[String], max_shown: usize) -> String {
    if hosts.len() <= max_shown {
        return hosts.join(", ");
    }
    format!(
        "{}, ... (+{} more)",
        hosts[..max_shown].join(", "),
        hosts.len() - max_shown
    )
}

// ============================================================================
// Tests
// ============================================================================
