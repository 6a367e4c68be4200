use alloy::{
    primitives::{
        Address, B256, Bytes, U256,
        aliases::{U24, U160},
    },
    sol,
    sol_types::{SolCall, SolValue},
};

/// `mint()`, shared by the token faucets and the NFT contracts.
pub const MINT_SELECTOR: [u8; 4] = [0x12, 0x49, 0xc5, 0x8b];

/// Domain registrar mint taking `(string name, uint256, uint256)`.
pub const DOMAIN_MINT_SELECTOR: [u8; 4] = [0x69, 0x2b, 0x39, 0x56];

sol! {
    function balanceOf(address owner) external view returns (uint256);
    function allowance(address owner, address spender) external view returns (uint256);
    function approve(address spender, uint256 amount) external returns (bool);

    struct ExactInputSingleParams {
        address tokenIn;
        address tokenOut;
        uint24 fee;
        address recipient;
        uint256 deadline;
        uint256 amountIn;
        uint256 amountOutMinimum;
        uint160 sqrtPriceLimitX96;
    }

    function exactInputSingle(ExactInputSingleParams params) external payable returns (uint256 amountOut);

    struct StorageChunk {
        bytes32 hash;
        uint256 size;
    }

    struct StorageSubmission {
        uint256 size;
        bytes tags;
        StorageChunk[] chunks;
    }

    function submit(StorageSubmission submission) external payable;
}

pub fn mint_calldata() -> Bytes {
    Bytes::copy_from_slice(&MINT_SELECTOR)
}

pub fn balance_of_calldata(owner: Address) -> Bytes {
    balanceOfCall { owner }.abi_encode().into()
}

pub fn allowance_calldata(owner: Address, spender: Address) -> Bytes {
    allowanceCall { owner, spender }.abi_encode().into()
}

pub fn approve_calldata(spender: Address, amount: U256) -> Bytes {
    approveCall { spender, amount }.abi_encode().into()
}

/// Single-hop swap with no price limit and a minimum output of one unit.
pub fn swap_calldata(
    token_in: Address,
    token_out: Address,
    fee: u32,
    recipient: Address,
    deadline: U256,
    amount_in: U256,
) -> Bytes {
    exactInputSingleCall {
        params: ExactInputSingleParams {
            tokenIn: token_in,
            tokenOut: token_out,
            fee: U24::from(fee),
            recipient,
            deadline,
            amountIn: amount_in,
            amountOutMinimum: U256::from(1),
            sqrtPriceLimitX96: U160::ZERO,
        },
    }
    .abi_encode()
    .into()
}

/// Registers a file of `size` bytes whose single chunk is `root`.
pub fn storage_submit_calldata(size: usize, root: B256) -> Bytes {
    submitCall {
        submission: StorageSubmission {
            size: U256::from(size),
            tags: Bytes::new(),
            chunks: vec![StorageChunk {
                hash: root,
                size: U256::ZERO,
            }],
        },
    }
    .abi_encode()
    .into()
}

pub fn domain_mint_calldata(name: &str) -> Bytes {
    let params = (name.to_string(), U256::from(1), U256::from(1)).abi_encode_params();
    let mut data = Vec::with_capacity(4 + params.len());
    data.extend_from_slice(&DOMAIN_MINT_SELECTOR);
    data.extend_from_slice(&params);
    data.into()
}

pub fn decode_uint(data: &[u8]) -> Option<U256> {
    balanceOfCall::abi_decode_returns(data).ok()
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, hex};

    use super::*;

    #[test]
    fn test_selectors_match_signatures() {
        assert_eq!(balanceOfCall::SELECTOR, hex!("70a08231"));
        assert_eq!(approveCall::SELECTOR, hex!("095ea7b3"));
        assert_eq!(exactInputSingleCall::SELECTOR, hex!("414bf389"));
        assert_eq!(mint_calldata().as_ref(), hex!("1249c58b"));
    }

    #[test]
    fn test_domain_calldata_layout() {
        let data = domain_mint_calldata("abcd");
        assert_eq!(&data[..4], &DOMAIN_MINT_SELECTOR);

        let words: Vec<&[u8]> = data[4..].chunks(32).collect();
        assert_eq!(words.len(), 5);
        assert_eq!(U256::from_be_slice(words[0]), U256::from(0x60));
        assert_eq!(U256::from_be_slice(words[1]), U256::from(1));
        assert_eq!(U256::from_be_slice(words[2]), U256::from(1));
        assert_eq!(U256::from_be_slice(words[3]), U256::from(4));
        assert_eq!(&words[4][..4], b"abcd");
    }

    #[test]
    fn test_swap_calldata_fields() {
        let token_in = address!("9A87C2412d500343c073E5Ae5394E3bE3874F76b");
        let token_out = address!("1E0D871472973c562650E991ED8006549F8CBEfc");
        let recipient = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
        let data = swap_calldata(
            token_in,
            token_out,
            3_000,
            recipient,
            U256::from(1_700_000_000u64),
            U256::from(10u64).pow(U256::from(16)),
        );

        let decoded = exactInputSingleCall::abi_decode(&data).unwrap();
        assert_eq!(decoded.params.tokenIn, token_in);
        assert_eq!(decoded.params.tokenOut, token_out);
        assert_eq!(decoded.params.fee, U24::from(3_000));
        assert_eq!(decoded.params.recipient, recipient);
        assert_eq!(decoded.params.amountOutMinimum, U256::from(1));
        assert_eq!(decoded.params.sqrtPriceLimitX96, U160::ZERO);
    }

    #[test]
    fn test_storage_submit_roundtrip() {
        let root = B256::repeat_byte(0xab);
        let data = storage_submit_calldata(42, root);
        let decoded = submitCall::abi_decode(&data).unwrap();
        assert_eq!(decoded.submission.size, U256::from(42));
        assert!(decoded.submission.tags.is_empty());
        assert_eq!(decoded.submission.chunks.len(), 1);
        assert_eq!(decoded.submission.chunks[0].hash, root);
    }

    #[test]
    fn test_decode_uint() {
        let mut word = [0u8; 32];
        word[31] = 7;
        assert_eq!(decode_uint(&word), Some(U256::from(7)));
        assert_eq!(decode_uint(&[1, 2]), None);
    }
}
