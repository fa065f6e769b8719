/// Keys used in the secure and plain stores.
///
/// Values match what earlier releases of the app wrote, so existing installs
/// keep their guest identity and tokens across upgrades.
pub struct StorageKeys;

impl StorageKeys {
    // Secure store
    pub const ACCESS_TOKEN: &'static str = "access_token";
    pub const REFRESH_TOKEN: &'static str = "refresh_token";

    // Plain store
    pub const GUEST_MODE: &'static str = "wouldyou_guest_mode";
    pub const GUEST_USAGE: &'static str = "wouldyou_guest_usage";
    pub const GUEST_DEVICE_ID: &'static str = "wouldyou_guest_device_id";
    pub const USER_PROFILE: &'static str = "wouldyou_user";
    pub const ONBOARDING_COMPLETE: &'static str = "onboarding_complete";
    pub const BIOMETRIC_ENABLED: &'static str = "biometricEnabled";
    pub const STREAK: &'static str = "wouldyou_streak";
    pub const LAST_PLAY: &'static str = "wouldyou_last_play";
}
