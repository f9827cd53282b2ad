//! EVM contract ABI definitions
//!
//! Uses alloy's sol! macro to generate type-safe bindings for the bridge,
//! the lending pool, and the faucet-enabled ERC20 test tokens.

#![allow(clippy::too_many_arguments)]

use alloy::sol;

sol! {
    /// Cross-chain bridge (one deployment per origin chain)
    #[sol(rpc)]
    contract QuantumBridge {
        struct MessagingFee {
            uint256 nativeFee;
            uint256 lzTokenFee;
        }

        // ========================================================================
        // Quoting
        // ========================================================================

        /// Encode the cross-chain message for a transfer
        function getMessage(uint256 _amount, address _token, address _receiver) external view returns (bytes memory);

        /// Build relay execution options for the destination
        function getLzReceiveOption(uint256 _gas, uint256 _value) external pure returns (bytes memory);

        /// Quote the relay fee for delivering a message
        function getFee(uint32 _dstEid, bytes memory _payload, bytes memory _options) external view returns (MessagingFee memory fee);

        // ========================================================================
        // Deposit Methods
        // ========================================================================

        /// Deposit ERC20 tokens; msg.value pays the relay fee
        function deposit(uint32 _dstEid, uint256 _amount, address _token, string memory _destChain, address _receiver) external payable;

        /// Deposit the native asset
        function depositNative(uint32 _dstEid, uint256 _amount, string memory _destChain) external payable;
    }

    /// Lending pool shared by every supported chain of a deployment
    #[sol(rpc)]
    contract LendingPool {
        // ========================================================================
        // Position Management
        // ========================================================================

        function supply(address _token, uint256 _amount) external;
        function borrow(uint256 _amount, address _token) external;
        function payDebt(address _token, uint256 _amount) external;
        function withdraw(address _token, uint256 _amount) external;

        // ========================================================================
        // View Functions
        // ========================================================================

        function interest(address _token, uint256 _principal) external view returns (uint256);
        function getTotalAmountLentInDollars(address _user) external view returns (uint256);
        function getUserTotalAmountBorrowedForTokenInDollars(address _user, address _token) external view returns (uint256);
        function getUserTotalAmountAvailableForBorrowInDollars(address _user) external view returns (uint256);
        function getTotalSupplyInDollars() external view returns (uint256);
        function getTotalBorrowedInDollars() external view returns (uint256);
        function getAllWhitelistedTokenNames() external view returns (string[] memory);
    }

    /// ERC20 test token with an open faucet mint
    #[sol(rpc)]
    contract ERC20 {
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function mint(address to, uint256 amount) external;

        event Approval(address indexed owner, address indexed spender, uint256 value);
    }
}
