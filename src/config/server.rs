use std::net::{AddrParseError, SocketAddr};

use super::var_or;

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub addr: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn get_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.get_addr().parse()
    }

    /// Defaults to `0.0.0.0:8000`, where the dashboard expects the API.
    pub fn init_from_env(&mut self) -> Result<(), String> {
        self.addr = var_or("SERVER_ADDR", "0.0.0.0".to_string())?;
        self.port = var_or("SERVER_PORT", 8000)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_addr_joins_host_and_port() {
        let config = ServerConfig {
            addr: "127.0.0.1".to_string(),
            port: 8000,
        };
        assert_eq!(config.get_socket_addr().unwrap().port(), 8000);
        assert!(ServerConfig {
            addr: "not an ip".to_string(),
            port: 1
        }
        .get_socket_addr()
        .is_err());
    }
}
