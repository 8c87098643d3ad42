pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const ADDRESS_HEX_SIZE: usize = HASH_HEX_SIZE;
pub const POW_DEFAULT_DIFFICULTY: usize = 2;
pub const MINING_INTERVAL_SECS: u64 = 60;

pub const GENESIS_INDEX: u64 = 100;
pub const GENESIS_PROOF: u64 = 100;
pub const GENESIS_PREV_HASH: &str = "1";
pub const GENESIS_SENDER: &str = "SYSTEM";
pub const GENESIS_SIGNATURE: &str = "GENESIS";
pub const GENESIS_RECEIVER: &str =
    "69c5f684026e6bd3e2a8f175a892ca6858cb9936b3c525ce11b981f848a69fc2";
pub const GENESIS_MESSAGE: &str = "Genesis Block - Social Blockchain Initialized";

pub const PATH_NODES_REGISTER: &str = "/nodes/register";
pub const PATH_NODES_NEW: &str = "/nodes/new";
pub const PATH_BLOCK_RECEIVE: &str = "/block/receive";
