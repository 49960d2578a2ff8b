use super::*;

#[test]
fn mul_div255_endpoints() {
    assert_eq!(mul_div255_u16(0, 255), 0);
    assert_eq!(mul_div255_u16(255, 255), 255);
    assert_eq!(mul_div255_u16(255, 0), 0);
}

#[test]
fn over_opaque_source_replaces_destination() {
    assert_eq!(over_channel(10, 255, 200), 10);
}

#[test]
fn over_transparent_source_keeps_destination() {
    assert_eq!(over_channel(0, 0, 200), 200);
}
