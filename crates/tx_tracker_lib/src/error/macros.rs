#[macro_export]
macro_rules! err_create {
    ($t:expr) => {
        $crate::error::TrackerError::new($t, file!(), line!())
    };
}

#[macro_export]
macro_rules! err_custom_create {
    ($($t:tt)*) => {
        $crate::error::TrackerError::new(
            $crate::error::CustomError::from_owned_string(format!($($t)*)),
            file!(),
            line!(),
        )
    };
}

#[macro_export]
macro_rules! err_from {
    () => {
        |e| $crate::error::TrackerError::new(e, file!(), line!())
    };
}
