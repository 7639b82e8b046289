use std::net::UdpSocket;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use log::debug;

use crate::error::TimeError;
use crate::traits::TimeSource;

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970)
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;
const NTP_PACKET_LEN: usize = 48;

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl TimeSource for LocalClock {
    fn now(&self) -> Result<DateTime<Local>, TimeError> {
        Ok(Local::now())
    }

    fn name(&self) -> &str {
        "local clock"
    }
}

/// Offset learned from the last successful sync
#[derive(Debug, Clone, Copy)]
struct SyncPoint {
    offset: TimeDelta,
    at: Instant,
}

#[derive(Debug, Default)]
struct SyncState {
    last_sync: Option<SyncPoint>,
    failed_at: Option<Instant>,
}

/// SNTP client that re-syncs at most once per `resync` interval
///
/// Between syncs it serves local time corrected by the last measured offset.
/// A failed sync is reported as an error so callers can fall back for that tick,
/// and the server is not queried again until `retry` has passed.
#[derive(Debug)]
pub struct SntpClock {
    server: String,
    timeout: Duration,
    resync: Duration,
    retry: Duration,
    state: Mutex<SyncState>,
}

impl SntpClock {
    pub fn new(server: impl Into<String>, timeout: Duration, resync: Duration) -> Self {
        Self {
            server: server.into(),
            timeout,
            resync,
            retry: Duration::from_secs(30),
            state: Mutex::new(SyncState::default()),
        }
    }

    /// Quiet period after a failed sync
    pub fn with_retry_backoff(mut self, retry: Duration) -> Self {
        self.retry = retry;
        self
    }

    fn query(&self) -> Result<DateTime<Utc>, TimeError> {
        let unreachable = |e: std::io::Error| TimeError::Unreachable(format!("{}: {e}", self.server));

        let socket = UdpSocket::bind("0.0.0.0:0").map_err(unreachable)?;
        socket.set_read_timeout(Some(self.timeout)).map_err(unreachable)?;
        socket.set_write_timeout(Some(self.timeout)).map_err(unreachable)?;
        socket.connect(self.server.as_str()).map_err(unreachable)?;

        socket.send(&request_packet()).map_err(unreachable)?;

        let mut buf = [0u8; NTP_PACKET_LEN];
        let len = socket.recv(&mut buf).map_err(unreachable)?;
        parse_ntp_response(&buf[..len])
    }

}

impl TimeSource for SntpClock {
    fn now(&self) -> Result<DateTime<Local>, TimeError> {
        // Held across the query so concurrent callers share one sync
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(sync) = state.last_sync.filter(|sync| sync.at.elapsed() < self.resync) {
            return Ok(Local::now() + sync.offset);
        }
        if let Some(failed) = state.failed_at {
            let since = failed.elapsed();
            if since < self.retry {
                return Err(TimeError::Unreachable(format!(
                    "{}: last sync failed, retrying in {}s",
                    self.server,
                    (self.retry - since).as_secs()
                )));
            }
        }

        let network = match self.query() {
            Ok(network) => network,
            Err(e) => {
                debug!("ntp sync with {} failed, backing off {:?}: {e}", self.server, self.retry);
                state.failed_at = Some(Instant::now());
                return Err(e);
            }
        };
        let offset = network - Utc::now();
        debug!("ntp sync with {}: offset {}ms", self.server, offset.num_milliseconds());

        state.failed_at = None;
        state.last_sync = Some(SyncPoint {
            offset,
            at: Instant::now(),
        });
        Ok(network.with_timezone(&Local))
    }

    fn name(&self) -> &str {
        &self.server
    }
}

/// Client request: LI = 0, version 3, mode 3 (client)
fn request_packet() -> [u8; NTP_PACKET_LEN] {
    let mut packet = [0u8; NTP_PACKET_LEN];
    packet[0] = 0x1B;
    packet
}

/// Extract the transmit timestamp from a server reply
pub fn parse_ntp_response(packet: &[u8]) -> Result<DateTime<Utc>, TimeError> {
    if packet.len() < NTP_PACKET_LEN {
        return Err(TimeError::Malformed(format!("short packet ({} bytes)", packet.len())));
    }

    let mode = packet[0] & 0x07;
    if mode != 4 {
        return Err(TimeError::Malformed(format!("unexpected mode {mode}")));
    }
    // Stratum 0 is a kiss-of-death reply
    if packet[1] == 0 {
        return Err(TimeError::Malformed("kiss-of-death reply".into()));
    }

    let seconds = u32::from_be_bytes([packet[40], packet[41], packet[42], packet[43]]) as u64;
    let fraction = u32::from_be_bytes([packet[44], packet[45], packet[46], packet[47]]) as u64;

    let unix_seconds = seconds
        .checked_sub(NTP_UNIX_OFFSET)
        .ok_or_else(|| TimeError::Malformed("timestamp before 1970".into()))?;
    let nanos = ((fraction * 1_000_000_000) >> 32) as u32;

    Utc.timestamp_opt(unix_seconds as i64, nanos)
        .single()
        .ok_or_else(|| TimeError::Malformed("timestamp out of range".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(seconds: u32, fraction: u32) -> [u8; NTP_PACKET_LEN] {
        let mut packet = [0u8; NTP_PACKET_LEN];
        packet[0] = 0x1C; // version 3, mode 4
        packet[1] = 2;
        packet[40..44].copy_from_slice(&seconds.to_be_bytes());
        packet[44..48].copy_from_slice(&fraction.to_be_bytes());
        packet
    }

    #[test]
    fn test_parse_transmit_timestamp() {
        // 2024-01-01T00:00:00Z
        let unix = 1_704_067_200u64;
        let packet = reply((unix + NTP_UNIX_OFFSET) as u32, 1 << 31);
        let time = parse_ntp_response(&packet).unwrap();
        assert_eq!(time.timestamp(), unix as i64);
        assert_eq!(time.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_parse_rejects_short_packet() {
        assert!(matches!(parse_ntp_response(&[0x1C; 12]), Err(TimeError::Malformed(_))));
    }

    #[test]
    fn test_parse_rejects_client_mode() {
        let mut packet = reply(3_900_000_000, 0);
        packet[0] = 0x1B;
        assert!(parse_ntp_response(&packet).is_err());
    }

    #[test]
    fn test_parse_rejects_kiss_of_death() {
        let mut packet = reply(3_900_000_000, 0);
        packet[1] = 0;
        assert!(parse_ntp_response(&packet).is_err());
    }

    #[test]
    fn test_request_packet_is_client_mode() {
        let packet = request_packet();
        assert_eq!(packet[0] & 0x07, 3);
        assert_eq!((packet[0] >> 3) & 0x07, 3);
    }

    #[test]
    fn test_unreachable_server_fails_within_timeout() {
        // Port 9 on loopback: nothing answers, recv times out or is refused
        let clock = SntpClock::new("127.0.0.1:9", Duration::from_millis(100), Duration::from_secs(60));
        let start = Instant::now();
        assert!(matches!(clock.now(), Err(TimeError::Unreachable(_))));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    /// Bound UDP socket that never answers
    fn silent_server() -> (UdpSocket, String) {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = socket.local_addr().unwrap().to_string();
        (socket, addr)
    }

    #[test]
    fn test_failed_sync_backs_off() {
        let (_server, addr) = silent_server();
        let clock = SntpClock::new(addr, Duration::from_millis(200), Duration::from_secs(60))
            .with_retry_backoff(Duration::from_secs(60));

        let start = Instant::now();
        assert!(clock.now().is_err());
        assert!(start.elapsed() >= Duration::from_millis(150));

        // Within the backoff the server is not asked again
        for _ in 0..3 {
            let start = Instant::now();
            assert!(matches!(clock.now(), Err(TimeError::Unreachable(_))));
            assert!(start.elapsed() < Duration::from_millis(100));
        }
    }

    #[test]
    fn test_query_resumes_after_backoff() {
        let (_server, addr) = silent_server();
        let clock = SntpClock::new(addr, Duration::from_millis(150), Duration::from_secs(60))
            .with_retry_backoff(Duration::ZERO);

        assert!(clock.now().is_err());
        let start = Instant::now();
        assert!(clock.now().is_err());
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_sync_is_cached_between_resyncs() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = server.local_addr().unwrap().to_string();
        let responder = std::thread::spawn(move || {
            let mut buf = [0u8; NTP_PACKET_LEN];
            let (_, peer) = server.recv_from(&mut buf).unwrap();
            let seconds = Utc::now().timestamp() as u64 + NTP_UNIX_OFFSET;
            server.send_to(&reply(seconds as u32, 0), peer).unwrap();
        });

        let clock = SntpClock::new(addr, Duration::from_secs(2), Duration::from_secs(60));
        let first = clock.now().unwrap();
        responder.join().unwrap();

        // The responder is gone; this must come from the cached offset
        let second = clock.now().unwrap();
        assert!((second - first).num_seconds().abs() < 5);
    }

    #[test]
    fn test_local_clock_always_succeeds() {
        assert!(LocalClock.now().is_ok());
    }
}
