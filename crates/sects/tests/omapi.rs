mod common;

use common::{LONG_SELECT_AID, SimulatedCard, TRANSMIT_AID, long_fci};
use sects::{AidConfig, ChannelSession, Error, OmapiTest, Scenario};
use sects_apdu_core::{CardExecutor, GetResponseProcessor, LogicalChannel, StatusWord};

fn session() -> ChannelSession<SimulatedCard> {
    ChannelSession::from_transport(SimulatedCard::new())
}

fn card(session: &ChannelSession<SimulatedCard>) -> &SimulatedCard {
    session.executor().transport()
}

#[test]
fn case_1_apdu_returns_no_data_in_one_cycle() {
    let mut session = session();

    let response = session.send_apdu_hex(&TRANSMIT_AID, "00060000").unwrap();

    assert_eq!(response.payload_hex(), "");
    assert_eq!(response.status().to_string(), "9000");
    assert_eq!(
        card(&session).log,
        [
            "0070000001",
            "01A4040010A000000476416E64726F69644354533100",
            "01060000",
            "0070800001",
        ]
    );
    assert_eq!(card(&session).open_channels(), 0);
}

#[test]
fn case_2_apdu_returns_256_bytes() {
    let mut session = session();

    let response = session
        .send_apdu_hex(&TRANSMIT_AID, "0008000000")
        .unwrap();

    assert_eq!(response.payload_hex().len(), 512);
    assert!(response.payload().iter().all(|&b| b == common::FILLER));
    assert_eq!(response.status(), StatusWord::new(0x90, 0x00));
    // The GET RESPONSE went out on the channel the command used
    assert!(card(&session).log.contains(&"01C0000000".to_string()));
}

#[test]
fn transmit_apdu_scenario_passes() {
    let mut session = session();
    let aids = AidConfig::default();

    OmapiTest::new(&mut session, &aids).transmit_apdu().unwrap();

    let card = card(&session);
    assert_eq!(card.count_ins(0x70), 32, "one open and one close per APDU");
    assert_eq!(card.count_ins(0xA4), 16);
    assert_eq!(card.count_ins(0xC0), 8);
    assert_eq!(card.open_channels(), 0);
}

#[test]
fn long_select_response_is_chained_and_validated() {
    let mut session = session();
    let channel = session.open_logical_channel().unwrap();

    let response = session
        .select_application_with_check_response(channel, &LONG_SELECT_AID)
        .unwrap();
    assert_eq!(response.payload().as_ref(), long_fci().as_slice());

    session.close_logical_channel(channel).unwrap();
    assert_eq!(card(&session).open_channels(), 0);
}

#[test]
fn execute_all_runs_every_scenario() {
    let mut session = session();
    let aids = AidConfig::default();

    OmapiTest::new(&mut session, &aids).execute_all().unwrap();

    assert_eq!(card(&session).open_channels(), 0);
    assert_eq!(session.open_channels().count(), 0);
}

#[test]
fn unknown_applet_fails_and_releases_channel() {
    let mut session = session();
    let aids = AidConfig {
        transmit: vec![0xA0, 0x00, 0x00, 0x00, 0x00],
        ..AidConfig::default()
    };

    let err = OmapiTest::new(&mut session, &aids)
        .run(Scenario::TransmitApdu)
        .unwrap_err();

    assert!(matches!(
        err.as_apdu(),
        Some(sects_apdu_core::Error::UnexpectedStatus { operation: "SELECT", .. })
    ));
    assert_eq!(card(&session).open_channels(), 0);
}

#[test]
fn card_without_logical_channels_aborts_scenarios() {
    let mut card = SimulatedCard::new();
    card.no_logical_channels = true;
    let mut session = ChannelSession::from_transport(card);
    let aids = AidConfig::default();

    let err = OmapiTest::new(&mut session, &aids)
        .execute_all()
        .unwrap_err();

    assert!(matches!(err, Error::Apdu(_)));
    assert_eq!(
        err.as_apdu(),
        Some(&sects_apdu_core::Error::unexpected_status(
            "MANAGE CHANNEL (open)",
            StatusWord::new(0x68, 0x81)
        ))
    );
    // Nothing past the first open was attempted
    assert_eq!(session.executor().transport().log.len(), 1);
}

#[test]
fn chain_limit_applies_to_long_select() {
    let executor =
        CardExecutor::with_processor(SimulatedCard::new(), GetResponseProcessor::new(0));
    let mut session = ChannelSession::new(executor);
    let channel = session.open_logical_channel().unwrap();

    let err = session
        .select_application(channel, &LONG_SELECT_AID)
        .unwrap_err();
    assert_eq!(err, sects_apdu_core::Error::ChainLimitExceeded(0));

    session.close_logical_channel(channel).unwrap();
}

#[test]
fn commands_on_unopened_channel_are_rejected_by_the_card() {
    let mut session = session();
    let channel = LogicalChannel::new(7).unwrap();

    let response = session
        .send_apdu_on_channel(channel, &[0x00, 0x06, 0x00, 0x00])
        .unwrap();
    assert_eq!(response.status(), StatusWord::new(0x68, 0x81));
    assert_eq!(card(&session).log, ["63060000"]);
}
