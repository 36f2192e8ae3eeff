use crate::lookups::{LookupError, Registration};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use tracing::debug;

const IANA_SERVER: &str = "whois.iana.org:43";
const WHOIS_PORT: u16 = 43;
const MAX_RESPONSE_BYTES: u64 = 256 * 1024;

const CREATION_KEYS: &[&str] = &[
    "creation date",
    "created",
    "created on",
    "created date",
    "registered",
    "registered on",
    "registration date",
    "registration time",
    "domain registration date",
    "domain record activated",
];

const EXPIRATION_KEYS: &[&str] = &[
    "registry expiry date",
    "registrar registration expiration date",
    "expiration date",
    "expiration time",
    "expiry date",
    "expire date",
    "expires",
    "expires on",
    "paid-till",
    "renewal date",
    "domain expiration date",
];

const NO_MATCH_MARKERS: &[&str] = &[
    "no match",
    "not found",
    "no entries found",
    "no data found",
    "no object found",
    "domain not found",
    "status: free",
    "status: available",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y.%m.%dT%H:%M:%SZ",
    "%Y.%m.%d %H:%M:%S",
    "%d-%b-%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%Y.%m.%d",
    "%d.%m.%Y",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%Y%m%d",
];

/// Minimal port-43 WHOIS client.
#[derive(Debug, Clone, Default)]
pub struct WhoisClient {
    server_override: Option<String>,
}

impl WhoisClient {
    pub fn new(server_override: Option<String>) -> Self {
        Self { server_override }
    }

    /// Look up the registration record of `domain`. `Ok(None)` means the
    /// registry answered but holds no record.
    pub async fn lookup(&self, domain: &str) -> Result<Option<Registration>, LookupError> {
        let server = match &self.server_override {
            Some(server) => with_port(server),
            None => self.server_for(domain).await?,
        };

        debug!("Querying WHOIS server {} for {}", server, domain);
        let response = query(&server, domain).await?;
        Ok(parse_registration(&response))
    }

    async fn server_for(&self, domain: &str) -> Result<String, LookupError> {
        let tld = domain.rsplit('.').next().unwrap_or_default().to_lowercase();
        if tld.is_empty() {
            return Err(LookupError::EmptyDomain);
        }

        if let Some(server) = known_server(&tld) {
            return Ok(with_port(server));
        }

        let iana = query(IANA_SERVER, &tld).await?;
        referral(&iana)
            .map(with_port)
            .ok_or(LookupError::NoWhoisServer(tld))
    }
}

/// Send one query line and read the whole response.
pub async fn query(server: &str, query: &str) -> Result<String, LookupError> {
    let mut stream = TcpStream::connect(server).await?;
    stream.write_all(format!("{}\r\n", query).as_bytes()).await?;

    let mut response = Vec::new();
    stream
        .take(MAX_RESPONSE_BYTES)
        .read_to_end(&mut response)
        .await?;

    Ok(String::from_utf8_lossy(&response).into_owned())
}

fn with_port(server: &str) -> String {
    if server.contains(':') {
        server.to_string()
    } else {
        format!("{}:{}", server, WHOIS_PORT)
    }
}

fn known_server(tld: &str) -> Option<&'static str> {
    let server = match tld {
        "com" | "net" => "whois.verisign-grs.com",
        "org" => "whois.pir.org",
        "info" => "whois.afilias.net",
        "biz" => "whois.nic.biz",
        "us" => "whois.nic.us",
        "co" => "whois.nic.co",
        "io" => "whois.nic.io",
        "me" => "whois.nic.me",
        "uk" => "whois.nic.uk",
        "ca" => "whois.cira.ca",
        "de" => "whois.denic.de",
        "fr" => "whois.afnic.fr",
        "ru" => "whois.tcinet.ru",
        "cn" => "whois.cnnic.cn",
        "jp" => "whois.jprs.jp",
        "au" => "whois.auda.org.au",
        "br" => "whois.registro.br",
        "in" => "whois.registry.in",
        "app" | "dev" => "whois.nic.google",
        _ => return None,
    };
    Some(server)
}

fn referral(iana_response: &str) -> Option<&str> {
    ["refer", "whois"].iter().find_map(|wanted| {
        iana_response.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            let value = value.trim();
            (key.trim().eq_ignore_ascii_case(wanted) && !value.is_empty()).then_some(value)
        })
    })
}

/// Extract creation and expiration dates from a raw WHOIS response. The first
/// parseable value of each field wins.
pub fn parse_registration(response: &str) -> Option<Registration> {
    let mut registration = Registration::default();

    for line in response.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        if registration.creation_date.is_none() && CREATION_KEYS.contains(&key.as_str()) {
            registration.creation_date = parse_date(value);
        } else if registration.expiration_date.is_none() && EXPIRATION_KEYS.contains(&key.as_str())
        {
            registration.expiration_date = parse_date(value);
        }
    }

    if registration.creation_date.is_none() && registration.expiration_date.is_none() {
        let lowered = response.to_lowercase();
        if lowered.trim().is_empty() || NO_MATCH_MARKERS.iter().any(|m| lowered.contains(m)) {
            return None;
        }
    }

    Some(registration)
}

pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    let date_part = value.split_whitespace().next()?;
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use tokio::net::TcpListener;

    const VERISIGN_RESPONSE: &str = "   Domain Name: EXAMPLE.COM
   Registry Domain ID: 2336799_DOMAIN_COM-VRSN
   Registrar WHOIS Server: whois.iana.org
   Updated Date: 2024-08-14T07:01:34Z
   Creation Date: 1995-08-14T04:00:00Z
   Registry Expiry Date: 2025-08-13T04:00:00Z
   Registrar: RESERVED-Internet Assigned Numbers Authority
>>> Last update of whois database: 2024-10-18T10:00:00Z <<<
";

    const NOMINET_RESPONSE: &str = "
    Domain name:
        bbc.co.uk

    Relevant dates:
        Registered on: before Aug-1996
        Expiry date:  13-Dec-2026
        Last updated:  11-Nov-2020
";

    #[test]
    fn test_parse_verisign_dates() {
        let registration = parse_registration(VERISIGN_RESPONSE).unwrap();
        let created = registration.creation_date.unwrap();
        assert_eq!((created.year(), created.month(), created.day()), (1995, 8, 14));
        let expires = registration.expiration_date.unwrap();
        assert_eq!((expires.year(), expires.month(), expires.day()), (2025, 8, 13));
    }

    #[test]
    fn test_parse_nominet_dates() {
        let registration = parse_registration(NOMINET_RESPONSE).unwrap();
        assert!(registration.creation_date.is_none());
        let expires = registration.expiration_date.unwrap();
        assert_eq!((expires.year(), expires.month(), expires.day()), (2026, 12, 13));
    }

    #[test]
    fn test_first_value_wins() {
        let response = "created: 2004.06.03T20:00:00Z\ncreated: 2010-01-01\npaid-till: 2025.07.01\n";
        let registration = parse_registration(response).unwrap();
        assert_eq!(registration.creation_date.unwrap().year(), 2004);
        assert_eq!(registration.expiration_date.unwrap().year(), 2025);
    }

    #[test]
    fn test_no_match_is_no_record() {
        assert_eq!(parse_registration("No match for \"NOPE-NOPE.COM\".\r\n"), None);
        assert_eq!(parse_registration(""), None);
    }

    #[test]
    fn test_record_without_dates() {
        let registration = parse_registration("Domain: denic.de\nStatus: connect\n").unwrap();
        assert_eq!(registration, Registration::default());
    }

    #[test]
    fn test_parse_date_formats() {
        for value in [
            "2020-03-01",
            "2020-03-01T00:00:00Z",
            "2020-03-01T00:00:00.000Z",
            "2020-03-01 00:00:00",
            "2020-03-01T00:00:00+00:00",
            "01-Mar-2020",
            "2020.03.01",
            "01.03.2020",
            "2020/03/01",
            "2020-03-01 00:00:00 UTC",
        ] {
            let parsed = parse_date(value).unwrap_or_else(|| panic!("failed to parse {value}"));
            assert_eq!((parsed.year(), parsed.month(), parsed.day()), (2020, 3, 1), "{value}");
        }
        assert_eq!(parse_date("before Aug-1996"), None);
    }

    #[test]
    fn test_referral() {
        let iana = "% IANA WHOIS server\ndomain:       NET\nrefer:        whois.verisign-grs.com\n";
        assert_eq!(referral(iana), Some("whois.verisign-grs.com"));
        assert_eq!(referral("whois:  whois.nic.xyz\n"), Some("whois.nic.xyz"));
        assert_eq!(referral("domain: X\n"), None);
    }

    #[test]
    fn test_with_port() {
        assert_eq!(with_port("whois.pir.org"), "whois.pir.org:43");
        assert_eq!(with_port("127.0.0.1:4343"), "127.0.0.1:4343");
    }

    #[tokio::test]
    async fn test_lookup_against_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 128];
            let n = socket.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"example.com\r\n");
            socket.write_all(VERISIGN_RESPONSE.as_bytes()).await.unwrap();
        });

        let client = WhoisClient::new(Some(addr.to_string()));
        let registration = client.lookup("example.com").await.unwrap().unwrap();
        assert_eq!(registration.creation_date.unwrap().year(), 1995);
    }

    #[tokio::test]
    async fn test_lookup_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = WhoisClient::new(Some(addr.to_string()));
        assert!(client.lookup("example.com").await.is_err());
    }
}
