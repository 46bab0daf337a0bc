//! `doctor`: resolve configuration and report whether the primary OTLP
//! address can actually be bound, without standing up the daemon (§6.3).

use crate::config::Config;

#[derive(Debug)]
pub struct DoctorReport {
    pub config: Config,
    pub primary_bind_ok: bool,
    pub primary_bind_error: Option<String>,
}

impl DoctorReport {
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("otlp-mcp doctor\n");
        out.push_str(&format!("  bind host:        {}\n", self.config.bind_host));
        out.push_str(&format!("  otlp ports:       {:?}\n", self.config.otlp_ports));
        out.push_str(&format!("  mcp transport:    {}\n", self.config.mcp_transport));
        out.push_str(&format!("  buffer capacity:  {}\n", self.config.buffer_capacity));
        if self.primary_bind_ok {
            out.push_str("  primary bind:     ok\n");
        } else {
            out.push_str(&format!(
                "  primary bind:     FAILED ({})\n",
                self.primary_bind_error.as_deref().unwrap_or("unknown error")
            ));
        }
        out
    }
}

/// Construct the effective `Config` and attempt (then immediately release)
/// a bind on its first configured OTLP port.
pub fn run(config: Config) -> DoctorReport {
    let primary_port = config.otlp_ports.first().copied().unwrap_or(4317);
    let addr = format!("{}:{primary_port}", config.bind_host);
    let bind_result = std::net::TcpListener::bind(&addr);
    let (primary_bind_ok, primary_bind_error) = match bind_result {
        Ok(listener) => {
            drop(listener);
            (true, None)
        }
        Err(e) => (false, Some(e.to_string())),
    };
    DoctorReport {
        config,
        primary_bind_ok,
        primary_bind_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_bind_failure_when_port_taken() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut config = Config::default();
        config.bind_host = "127.0.0.1".to_string();
        config.otlp_ports = vec![port];
        let report = run(config);
        assert!(!report.primary_bind_ok);
        drop(listener);
    }

    #[test]
    fn render_includes_transport_and_ports() {
        let config = Config::default();
        let report = DoctorReport {
            config,
            primary_bind_ok: true,
            primary_bind_error: None,
        };
        let rendered = report.render();
        assert!(rendered.contains("mcp transport"));
        assert!(rendered.contains("ok"));
    }
}
