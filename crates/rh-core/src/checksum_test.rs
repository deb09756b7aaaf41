use super::*;

#[test]
fn test_lines_match_joined_text() {
    assert_eq!(
        compute_checksum_lines(["1\tnm1", "2\tnm2"]),
        compute_checksum("1\tnm1\n2\tnm2\n")
    );
    assert_ne!(
        compute_checksum_lines(["1\tnm1", "2\tnm2"]),
        compute_checksum_lines(["1\tnm2", "2\tnm1"])
    );
}
