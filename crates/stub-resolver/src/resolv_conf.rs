//! Reading nameserver addresses out of the system resolver
//! configuration.

use std::net::Ipv4Addr;
use std::path::Path;

/// Pull the nameserver addresses out of resolv.conf-format text:
/// lines of the form `nameserver <address>`, in file order.  Comment
/// lines, other directives, and addresses which are not IPv4 are
/// ignored.
pub fn parse(contents: &str) -> Vec<Ipv4Addr> {
    let mut nameservers = Vec::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.starts_with('#') {
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 2 || tokens[0] != "nameserver" {
            continue;
        }

        if let Ok(address) = tokens[1].parse() {
            nameservers.push(address);
        }
    }

    nameservers
}

/// Read and parse the resolver configuration at `path`.  A missing
/// or unreadable file is treated as an empty one; the caller decides
/// whether an empty list is an error.
pub async fn system_nameservers(path: &Path) -> Vec<Ipv4Addr> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => parse(&contents),
        Err(error) => {
            tracing::debug!(?path, %error, "could not read resolver configuration");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_nameserver_lines_in_order() {
        let contents = "nameserver 1.1.1.1\nnameserver 8.8.8.8\n";

        assert_eq!(
            vec![Ipv4Addr::new(1, 1, 1, 1), Ipv4Addr::new(8, 8, 8, 8)],
            parse(contents)
        );
    }

    #[test]
    fn parse_skips_comments_and_other_directives() {
        let contents = "\
# local overrides
search example.com
options edns0 trust-ad
nameserver 192.168.0.53
";

        assert_eq!(vec![Ipv4Addr::new(192, 168, 0, 53)], parse(contents));
    }

    #[test]
    fn parse_tolerates_leading_whitespace() {
        assert_eq!(
            vec![Ipv4Addr::new(10, 0, 0, 1)],
            parse("\t  nameserver 10.0.0.1")
        );
    }

    #[test]
    fn parse_skips_malformed_entries() {
        let contents = "\
nameserver
nameserver one.one.one.one
nameserver fe80::1
nameserver 1.1.1.1 extra
nameserver 9.9.9.9
";

        assert_eq!(vec![Ipv4Addr::new(9, 9, 9, 9)], parse(contents));
    }

    #[test]
    fn parse_of_empty_input_is_empty() {
        assert!(parse("").is_empty());
    }
}
