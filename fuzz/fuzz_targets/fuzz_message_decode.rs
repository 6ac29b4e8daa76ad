#![no_main]

use libfuzzer_sys::fuzz_target;

use rebase_bridge::CrossChainMessage;

fuzz_target!(|data: &[u8]| {
    if let Ok(message) = CrossChainMessage::decode(data) {
        assert_eq!(message.id, message.compute_id());
    }
    let _ = bincode::deserialize::<rebase_types::Address>(data);
    let _ = bincode::deserialize::<rebase_types::TokenAmount>(data);
    let _ = bincode::deserialize::<rebase_types::ChainSelector>(data);
});
