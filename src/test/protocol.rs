use crate::proto::congestion::{
    CongestionAlgorithm, CongestionOption, WestwoodFilter, WestwoodProtocol,
};
use crate::scenario::{ConfigError, TransportProtocol};

#[test]
fn every_canonical_name_round_trips() {
    let all: Vec<_> = TransportProtocol::all().collect();
    assert_eq!(all.len(), 12);
    for p in all {
        assert_eq!(TransportProtocol::from_name(p.name()), Ok(p));
        assert_eq!(p.to_string(), p.name());
    }
}

#[test]
fn tcp_prefixed_aliases_resolve_to_the_canonical_protocol() {
    assert_eq!("TcpWestwood".parse::<TransportProtocol>(), Ok(TransportProtocol::Westwood));
    assert_eq!("TcpNewReno".parse::<TransportProtocol>(), Ok(TransportProtocol::NewReno));
    assert_eq!(
        "Westwood-Plus".parse::<TransportProtocol>(),
        Ok(TransportProtocol::WestwoodPlus)
    );
    assert_eq!(
        TransportProtocol::from_name("TcpWestwoodPlus").map(|p| p.name()),
        Ok("WestwoodPlus")
    );
}

#[test]
fn unknown_protocol_lists_the_valid_names() {
    let err = TransportProtocol::from_name("Cubic").expect_err("unknown");
    let ConfigError::UnknownProtocol { name, expected } = &err else {
        panic!("unexpected error: {err:?}");
    };
    assert_eq!(name, "Cubic");
    assert!(expected.contains("Westwood"));
    assert!(expected.contains("Illinois"));
    // 大小写敏感
    assert!(TransportProtocol::from_name("westwood").is_err());
}

#[test]
fn westwood_plus_sets_the_plus_sub_option_and_westwood_does_not() {
    let plain = TransportProtocol::Westwood.socket_type();
    assert_eq!(plain.algorithm, CongestionAlgorithm::Westwood);
    assert_eq!(plain.westwood_protocol(), WestwoodProtocol::Westwood);
    assert_eq!(plain.westwood_filter(), WestwoodFilter::Tustin);
    assert!(!plain
        .options
        .contains(&CongestionOption::ProtocolType(WestwoodProtocol::WestwoodPlus)));

    let plus = TransportProtocol::WestwoodPlus.socket_type();
    assert_eq!(plus.algorithm, CongestionAlgorithm::Westwood);
    assert_eq!(plus.westwood_protocol(), WestwoodProtocol::WestwoodPlus);
    assert_eq!(plus.westwood_filter(), WestwoodFilter::Tustin);
}

#[test]
fn other_protocols_map_to_their_own_algorithm_without_options() {
    let cases = [
        (TransportProtocol::NewReno, CongestionAlgorithm::NewReno),
        (TransportProtocol::Hybla, CongestionAlgorithm::Hybla),
        (TransportProtocol::HighSpeed, CongestionAlgorithm::HighSpeed),
        (TransportProtocol::Htcp, CongestionAlgorithm::Htcp),
        (TransportProtocol::Vegas, CongestionAlgorithm::Vegas),
        (TransportProtocol::Scalable, CongestionAlgorithm::Scalable),
        (TransportProtocol::Veno, CongestionAlgorithm::Veno),
        (TransportProtocol::Bic, CongestionAlgorithm::Bic),
        (TransportProtocol::Yeah, CongestionAlgorithm::Yeah),
        (TransportProtocol::Illinois, CongestionAlgorithm::Illinois),
    ];
    for (p, alg) in cases {
        let st = p.socket_type();
        assert_eq!(st.algorithm, alg, "{p}");
        assert!(st.options.is_empty(), "{p}");
    }
}
