/// Coarse `Browser: X, OS: Y` summary for login alerts.
///
/// ```
/// use service::auth::user_agent::summarize;
/// let ua = "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/128.0";
/// assert_eq!(summarize(Some(ua)), "Browser: Firefox, OS: Linux");
/// assert_eq!(summarize(None), "Unknown");
/// ```
pub fn summarize(user_agent: Option<&str>) -> String {
    let Some(ua) = user_agent.filter(|s| !s.is_empty()) else { return "Unknown".into() };

    let browser = if ua.contains("Chrome") && !ua.contains("Edg") {
        "Chrome"
    } else if ua.contains("Firefox") {
        "Firefox"
    } else if ua.contains("Safari") && !ua.contains("Chrome") {
        "Safari"
    } else if ua.contains("Edg") {
        "Edge"
    } else {
        "Unknown"
    };

    // Order matters: Android and iOS agents also mention Linux and Mac.
    let os = if ua.contains("Android") {
        "Android"
    } else if ua.contains("iPhone") || ua.contains("iPad") {
        "iOS"
    } else if ua.contains("Win") {
        "Windows"
    } else if ua.contains("Mac") {
        "MacOS"
    } else if ua.contains("Linux") {
        "Linux"
    } else {
        "Unknown"
    };

    format!("Browser: {browser}, OS: {os}")
}

#[cfg(test)]
mod tests {
    use super::summarize;

    #[test]
    fn common_agents() {
        let chrome_win = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36";
        assert_eq!(summarize(Some(chrome_win)), "Browser: Chrome, OS: Windows");

        let edge = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/126.0 Safari/537.36 Edg/126.0";
        assert_eq!(summarize(Some(edge)), "Browser: Edge, OS: Windows");

        let safari_ios = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like Mac OS X) AppleWebKit/605.1.15 Version/17.5 Mobile/15E148 Safari/604.1";
        assert_eq!(summarize(Some(safari_ios)), "Browser: Safari, OS: iOS");

        let android = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 Chrome/126.0 Mobile Safari/537.36";
        assert_eq!(summarize(Some(android)), "Browser: Chrome, OS: Android");
    }

    #[test]
    fn unknown_agent() {
        assert_eq!(summarize(Some("curl/8.5.0")), "Browser: Unknown, OS: Unknown");
        assert_eq!(summarize(Some("")), "Unknown");
    }

    #[test]
    fn oversized_agent_still_yields_a_short_summary() {
        let huge = format!("Mozilla/5.0 (Windows NT 10.0) Firefox/128.0 {}", "x".repeat(10_000));
        assert_eq!(summarize(Some(&huge)), "Browser: Firefox, OS: Windows");
    }
}
