//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`KeyValueStore`] for the accessory. Numeric `(domain, key)`
//! pairs map onto NVS names: domain `0x00` becomes namespace `app.00`, key
//! `0x00` becomes blob key `k00`.
//!
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`.
//! - The host simulation keeps blobs in a `HashMap`; tests can inject
//!   failures through [`NvsStore::sim_fail_writes`].

use core::fmt::Write as _;

use heapless::String;
use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::{KeyValueStore, StorageError};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// NVS name buffer: 15 characters plus the terminating NUL.
type NvsName = String<16>;

fn namespace_name(domain: u8) -> NvsName {
    let mut name = NvsName::new();
    let _ = write!(name, "app.{:02x}", domain);
    name
}

fn key_name(key: u8) -> NvsName {
    let mut name = NvsName::new();
    let _ = write!(name, "k{:02x}", key);
    name
}

pub struct NvsStore {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<(u8, u8), Vec<u8>>>,
    #[cfg(not(target_os = "espidf"))]
    fail_writes: u32,
}

impl NvsStore {
    /// Create the store and initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the NVS partition is
    /// erased and re-initialised automatically.
    pub fn new() -> Result<Self, StorageError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NvsStore: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(StorageError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(StorageError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(StorageError::IoError);
            }
            info!("NvsStore: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsStore: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
            #[cfg(not(target_os = "espidf"))]
            fail_writes: 0,
        })
    }

    /// Make the next `count` writes fail with [`StorageError::IoError`].
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_writes(&mut self, count: u32) {
        self.fail_writes = count;
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(domain: u8, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns = namespace_name(domain);
        ns_buf[..ns.len()].copy_from_slice(ns.as_bytes());

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        // SAFETY: ns_buf is NUL-terminated; handle is a valid out pointer.
        let ret = unsafe { nvs_open(ns_buf.as_ptr().cast(), mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        // SAFETY: handle was opened above and is not used after this point.
        unsafe {
            nvs_close(handle);
        }
        result
    }

    #[cfg(target_os = "espidf")]
    fn key_buf(key: u8) -> [u8; 16] {
        let mut buf = [0u8; 16];
        let name = key_name(key);
        buf[..name.len()].copy_from_slice(name.as_bytes());
        buf
    }
}

impl KeyValueStore for NvsStore {
    fn get(&self, domain: u8, key: u8, buf: &mut [u8]) -> Result<Option<usize>, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            match self.store.borrow().get(&(domain, key)) {
                Some(data) => {
                    let len = data.len().min(buf.len());
                    buf[..len].copy_from_slice(&data[..len]);
                    Ok(Some(data.len()))
                }
                None => Ok(None),
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let key_buf = Self::key_buf(key);
            let result = Self::with_nvs_handle(domain, false, |handle| {
                // First call: stored size only.
                let mut size: usize = 0;
                // SAFETY: null data pointer asks NVS for the blob length.
                let ret = unsafe {
                    nvs_get_blob(handle, key_buf.as_ptr().cast(), core::ptr::null_mut(), &mut size)
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                if size > buf.len() {
                    return Ok(size);
                }

                let mut read = buf.len();
                // SAFETY: buf is valid for `read` bytes.
                let ret = unsafe {
                    nvs_get_blob(handle, key_buf.as_ptr().cast(), buf.as_mut_ptr().cast(), &mut read)
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(size)
            });
            match result {
                Ok(size) => Ok(Some(size)),
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Ok(None),
                Err(e) => {
                    warn!("NvsStore: read {}/{} failed ({})", namespace_name(domain), key_name(key), e);
                    Err(StorageError::IoError)
                }
            }
        }
    }

    fn set(&mut self, domain: u8, key: u8, data: &[u8]) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            if self.fail_writes > 0 {
                self.fail_writes -= 1;
                return Err(StorageError::IoError);
            }
            self.store.borrow_mut().insert((domain, key), data.to_vec());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let key_buf = Self::key_buf(key);
            let result = Self::with_nvs_handle(domain, true, |handle| {
                // SAFETY: data is valid for data.len() bytes.
                let ret = unsafe {
                    nvs_set_blob(handle, key_buf.as_ptr().cast(), data.as_ptr().cast(), data.len())
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            result.map_err(|e| {
                warn!("NvsStore: write {}/{} failed ({})", namespace_name(domain), key_name(key), e);
                if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE {
                    StorageError::Full
                } else {
                    StorageError::IoError
                }
            })
        }
    }

    fn remove(&mut self, domain: u8, key: u8) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store.borrow_mut().remove(&(domain, key));
            info!("NvsStore: removed {}/{}", namespace_name(domain), key_name(key));
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let key_buf = Self::key_buf(key);
            let result = Self::with_nvs_handle(domain, true, |handle| {
                let ret = unsafe { nvs_erase_key(handle, key_buf.as_ptr().cast()) };
                if ret != ESP_OK && ret != ESP_ERR_NVS_NOT_FOUND {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => {
                    info!("NvsStore: removed {}/{}", namespace_name(domain), key_name(key));
                    Ok(())
                }
                // A namespace that was never written cannot be opened read-write
                // on some IDF versions; nothing to delete in that case.
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Ok(()),
                Err(_) => Err(StorageError::IoError),
            }
        }
    }
}
