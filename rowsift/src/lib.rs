pub use rowsift_scan::*;
pub use {
    rowsift_error as error, rowsift_io as io, rowsift_kernel as kernel, rowsift_mask as mask,
    rowsift_metrics as metrics,
};
