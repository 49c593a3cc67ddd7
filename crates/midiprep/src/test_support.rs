//! Raw SMF builders for unit tests.

/// Concatenate delta-prefixed events and append end-of-track.
pub fn track_chunk(events: &[&[u8]]) -> Vec<u8> {
    let mut data: Vec<u8> = events.iter().flat_map(|e| e.iter().copied()).collect();
    data.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
    data
}

/// Format-1 file with the given resolution and track bodies.
pub fn smf_bytes(ppq: u16, tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"MThd");
    buf.extend_from_slice(&6u32.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes());
    buf.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    buf.extend_from_slice(&ppq.to_be_bytes());
    for track in tracks {
        buf.extend_from_slice(b"MTrk");
        buf.extend_from_slice(&(track.len() as u32).to_be_bytes());
        buf.extend_from_slice(track);
    }
    buf
}
